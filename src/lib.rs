//! A resilient DNS resolution engine backed by a cloud compute inventory
//! service.
//!
//! Instead of static zone files, this crate answers name-resolution
//! queries by asking an EC2-style inventory API which addresses belong to
//! a name -- and keeps answering when that API is unreachable, slow, or
//! failing. The pieces:
//!
//! * [engine::Engine] orchestrates a query: check the cache, call the
//!   backend through the coalescer, retry per policy, fall back to a
//!   stale cached answer before failing.
//! * [client] defines the single-round-trip backend seam: the
//!   [SendLookup][client::SendLookup] trait and an
//!   [InventoryClient][client::InventoryClient] that classifies raw
//!   transport outcomes into the failure taxonomy.
//! * [cache] holds last known-good answers. Entries go stale but are
//!   never evicted for staleness alone -- during an outage a stale
//!   answer beats no answer.
//! * [retry] decides, per failure class, between retrying now, retrying
//!   after backoff, and giving up.
//! * [coalesce] ensures one in-flight backend call per key regardless of
//!   how many callers ask concurrently.
//!
//! The DNS wire protocol, the inventory API's transport and
//! authentication, and configuration loading all live outside this
//! crate. The engine returns a [Resolved][answer::Resolved] answer or a
//! typed [ResolveError][error::ResolveError] that a DNS frontend maps to
//! a response code.

#![warn(missing_docs)]

pub mod answer;
pub mod cache;
pub mod client;
pub mod clock;
pub mod coalesce;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod retry;

pub use self::answer::{AddressRecord, Answer, RecordType, Resolved, Ttl};
pub use self::client::{
    InventoryClient, InventoryResponse, InventoryTransport, SendLookup,
};
pub use self::config::Config;
pub use self::engine::Engine;
pub use self::error::{FailureClass, LookupError, ResolveError};
pub use self::key::{KeyError, QueryKey};
