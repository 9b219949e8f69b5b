//! Error types.
//!
//! The taxonomy matters more here than the individual variants: every
//! backend failure falls into one of three classes that the retry policy
//! branches on. `Transient` failures are expected to self-heal and are
//! retried with backoff. `ServerError` means the backend was reached but
//! is unhealthy; it is retried once and then the engine falls back to the
//! cache. `Permanent` is an authoritative negative answer; it is never
//! retried and never masked by a stale cache entry.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::key::KeyError;
use std::error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

//------------ FailureClass ---------------------------------------------------

/// The retry-relevant classification of a backend failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureClass {
    /// A network-level failure that is expected to self-resolve.
    Transient,

    /// The backend responded but signaled an internal fault.
    ServerError,

    /// An authoritative negative answer.
    Permanent,
}

//------------ LookupError ----------------------------------------------------

/// The failure of a single backend round trip.
///
/// I/O errors are wrapped in [Arc] so the error stays `Clone`; the
/// coalescer hands the same outcome to every waiting follower.
#[derive(Clone, Debug)]
pub enum LookupError {
    /// No response arrived within the lookup deadline.
    Timeout,

    /// The connection could not be established or was torn down.
    Connect(Arc<std::io::Error>),

    /// The exchange failed mid-request.
    Transport(Arc<std::io::Error>),

    /// The backend answered with a non-success status code.
    Status(u16),

    /// The backend answered that the name does not exist.
    NotFound,
}

impl LookupError {
    /// Returns the failure class of this error.
    pub fn class(&self) -> FailureClass {
        match self {
            LookupError::Timeout
            | LookupError::Connect(_)
            | LookupError::Transport(_) => FailureClass::Transient,
            LookupError::Status(_) => FailureClass::ServerError,
            LookupError::NotFound => FailureClass::Permanent,
        }
    }
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            LookupError::Timeout => {
                write!(f, "timeout waiting for backend response")
            }
            LookupError::Connect(_) => {
                write!(f, "error connecting to backend")
            }
            LookupError::Transport(_) => {
                write!(f, "error exchanging with backend")
            }
            LookupError::Status(status) => {
                write!(f, "backend returned status {}", status)
            }
            LookupError::NotFound => write!(f, "name does not exist"),
        }
    }
}

impl error::Error for LookupError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LookupError::Timeout => None,
            LookupError::Connect(e) => Some(e),
            LookupError::Transport(e) => Some(e),
            LookupError::Status(_) => None,
            LookupError::NotFound => None,
        }
    }
}

//------------ ResolveError ---------------------------------------------------

/// The failure of a resolution as seen by the engine's caller.
///
/// Backend-level failures are absorbed inside the engine; a caller only
/// ever sees one of these terminal states. A DNS frontend maps
/// [NotFound][ResolveError::NotFound] to NXDOMAIN and
/// [NoAnswer][ResolveError::NoAnswer] to SERVFAIL.
#[derive(Clone, Debug)]
pub enum ResolveError {
    /// The query name could not be normalized into a key.
    InvalidName(KeyError),

    /// The backend authoritatively answered that the name does not exist.
    NotFound,

    /// Retries were exhausted and no cached answer was available.
    ///
    /// Carries the final backend error.
    NoAnswer(LookupError),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            ResolveError::InvalidName(_) => write!(f, "invalid query name"),
            ResolveError::NotFound => write!(f, "name does not exist"),
            ResolveError::NoAnswer(_) => {
                write!(f, "backend unavailable and no cached answer")
            }
        }
    }
}

impl error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ResolveError::InvalidName(e) => Some(e),
            ResolveError::NotFound => None,
            ResolveError::NoAnswer(e) => Some(e),
        }
    }
}

impl From<KeyError> for ResolveError {
    fn from(err: KeyError) -> Self {
        ResolveError::InvalidName(err)
    }
}
