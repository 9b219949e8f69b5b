//! The inventory client.
//!
//! The client performs exactly one round trip against the compute
//! inventory service per call and classifies the outcome; retry logic and
//! caching live in the engine. The actual exchange -- transport, signing,
//! endpoint selection -- happens behind the [InventoryTransport] trait so
//! the engine can be tested against a scripted backend.
//!
//! A lookup returns every address record the inventory has for a name.
//! Filtering by record type happens at the engine's edge, so one backend
//! call can satisfy concurrent A and AAAA queries for the same name.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::answer::{AddressRecord, Answer};
use crate::error::LookupError;
use crate::key::QueryKey;
use futures_util::future::BoxFuture;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::trace;

//------------ SendLookup -----------------------------------------------------

/// Trait for starting a single address lookup against the backend.
///
/// One call is one network round trip; implementations must not retry or
/// consult any cache.
pub trait SendLookup {
    /// Looks up the address records for a key.
    ///
    /// The returned future is detached from `self` so the engine can run
    /// it to completion on its own task.
    fn lookup(
        &self,
        key: &QueryKey,
    ) -> BoxFuture<'static, Result<Answer, LookupError>>;
}

//------------ InventoryTransport ---------------------------------------------

/// The raw exchange with the inventory service.
///
/// This is the boundary to the excluded collaborator: implementations own
/// connections, authentication and wire encoding, and perform exactly one
/// request per call. Timeouts and status classification are applied by
/// [InventoryClient] on top.
pub trait InventoryTransport {
    /// Performs one exchange for the given key.
    fn exchange(
        &self,
        key: &QueryKey,
    ) -> BoxFuture<'static, Result<InventoryResponse, io::Error>>;
}

//------------ InventoryResponse ----------------------------------------------

/// What one inventory exchange yields.
#[derive(Clone, Debug)]
pub struct InventoryResponse {
    /// The HTTP-style status code of the response.
    pub status: u16,

    /// The address records in the response. May be empty, which on a
    /// success status means the name does not exist.
    pub records: Vec<AddressRecord>,
}

//------------ InventoryClient ------------------------------------------------

/// A [SendLookup] implementation over an [InventoryTransport].
///
/// Applies the per-call deadline and turns the raw response into an
/// answer or a classified [LookupError].
#[derive(Clone, Debug)]
pub struct InventoryClient<T> {
    /// The transport performing the raw exchange.
    transport: T,

    /// Deadline for a single exchange.
    lookup_timeout: Duration,
}

impl<T> InventoryClient<T> {
    /// Creates a new client.
    pub fn new(transport: T, lookup_timeout: Duration) -> Self {
        Self {
            transport,
            lookup_timeout,
        }
    }
}

impl<T> SendLookup for InventoryClient<T>
where
    T: InventoryTransport,
{
    fn lookup(
        &self,
        key: &QueryKey,
    ) -> BoxFuture<'static, Result<Answer, LookupError>> {
        let exchange = self.transport.exchange(key);
        let deadline = self.lookup_timeout;
        let key = key.clone();
        Box::pin(async move {
            let response = match timeout(deadline, exchange).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => return Err(classify_io(err)),
                Err(_) => return Err(LookupError::Timeout),
            };
            trace!(%key, status = response.status, "inventory response");
            classify_response(response)
        })
    }
}

//------------ Utility --------------------------------------------------------

/// Classifies an I/O error from the transport.
fn classify_io(err: io::Error) -> LookupError {
    match err.kind() {
        io::ErrorKind::TimedOut => LookupError::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => LookupError::Connect(Arc::new(err)),
        _ => LookupError::Transport(Arc::new(err)),
    }
}

/// Turns a raw response into an answer or a classified error.
///
/// A success status with no records is an authoritative "name does not
/// exist". Any non-success status is treated as a server fault; the
/// inventory API has no meaningful client-error responses for a
/// well-formed name lookup.
fn classify_response(
    response: InventoryResponse,
) -> Result<Answer, LookupError> {
    if !(200..300).contains(&response.status) {
        return Err(LookupError::Status(response.status));
    }
    if response.records.is_empty() {
        return Err(LookupError::NotFound);
    }
    Ok(Answer::new(response.records))
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::Ttl;
    use crate::error::FailureClass;

    /// A transport that returns a fixed outcome.
    struct Fixed(Box<dyn Fn() -> Result<InventoryResponse, io::Error> + Send + Sync>);

    impl InventoryTransport for Fixed {
        fn exchange(
            &self,
            _key: &QueryKey,
        ) -> BoxFuture<'static, Result<InventoryResponse, io::Error>> {
            let outcome = (self.0)();
            Box::pin(async move { outcome })
        }
    }

    fn key() -> QueryKey {
        QueryKey::new("host.example.com").unwrap()
    }

    fn record() -> AddressRecord {
        AddressRecord::new("203.0.113.5".parse().unwrap(), Ttl::from_secs(60))
    }

    fn client(
        outcome: impl Fn() -> Result<InventoryResponse, io::Error>
            + Send
            + Sync
            + 'static,
    ) -> InventoryClient<Fixed> {
        InventoryClient::new(Fixed(Box::new(outcome)), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn success_yields_answer() {
        let client = client(|| {
            Ok(InventoryResponse {
                status: 200,
                records: vec![record()],
            })
        });
        let answer = client.lookup(&key()).await.unwrap();
        assert_eq!(answer.records(), &[record()]);
    }

    #[tokio::test]
    async fn empty_success_is_permanent() {
        let client = client(|| {
            Ok(InventoryResponse {
                status: 200,
                records: Vec::new(),
            })
        });
        let err = client.lookup(&key()).await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
        assert_eq!(err.class(), FailureClass::Permanent);
    }

    #[tokio::test]
    async fn server_error_status() {
        let client = client(|| {
            Ok(InventoryResponse {
                status: 503,
                records: Vec::new(),
            })
        });
        let err = client.lookup(&key()).await.unwrap_err();
        assert!(matches!(err, LookupError::Status(503)));
        assert_eq!(err.class(), FailureClass::ServerError);
    }

    #[tokio::test]
    async fn connection_errors_are_transient() {
        let client = client(|| {
            Err(io::Error::from(io::ErrorKind::ConnectionRefused))
        });
        let err = client.lookup(&key()).await.unwrap_err();
        assert!(matches!(err, LookupError::Connect(_)));
        assert_eq!(err.class(), FailureClass::Transient);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_yields_timeout() {
        /// A transport that never answers.
        struct Hung;

        impl InventoryTransport for Hung {
            fn exchange(
                &self,
                _key: &QueryKey,
            ) -> BoxFuture<'static, Result<InventoryResponse, io::Error>>
            {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(io::Error::from(io::ErrorKind::TimedOut))
                })
            }
        }

        let client = InventoryClient::new(Hung, Duration::from_millis(100));
        let err = client.lookup(&key()).await.unwrap_err();
        assert!(matches!(err, LookupError::Timeout));
        assert_eq!(err.class(), FailureClass::Transient);
    }
}
