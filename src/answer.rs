//! Answers produced by the inventory backend.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::time::Duration;

//------------ RecordType -----------------------------------------------------

/// The record types the inventory backend can produce.
///
/// The backend maps names to instance addresses, so only address records
/// exist. Queries for anything else are answered negatively by the caller
/// before they reach the engine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RecordType {
    /// An IPv4 address record.
    A,

    /// An IPv6 address record.
    Aaaa,
}

impl RecordType {
    /// Returns the record type matching an address.
    pub fn for_addr(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::Aaaa => f.write_str("AAAA"),
        }
    }
}

//------------ Ttl ------------------------------------------------------------

/// A time-to-live in seconds.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ttl(u32);

impl Ttl {
    /// Creates a TTL from a number of seconds.
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Returns the TTL in seconds.
    pub const fn as_secs(self) -> u32 {
        self.0
    }

    /// Returns the TTL as a [Duration].
    pub const fn as_duration(self) -> Duration {
        Duration::from_secs(self.0 as u64)
    }
}

impl Display for Ttl {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

//------------ AddressRecord --------------------------------------------------

/// A single address record for a query key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AddressRecord {
    /// The address.
    addr: IpAddr,

    /// The record type, always consistent with the address family.
    rtype: RecordType,

    /// How long the record may be served by downstream caches.
    ttl: Ttl,
}

impl AddressRecord {
    /// Creates a new record. The record type follows the address family.
    pub fn new(addr: IpAddr, ttl: Ttl) -> Self {
        Self {
            rtype: RecordType::for_addr(&addr),
            addr,
            ttl,
        }
    }

    /// Returns the address.
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Returns the record type.
    pub fn rtype(&self) -> RecordType {
        self.rtype
    }

    /// Returns the time-to-live.
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }
}

impl Display for AddressRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{} IN {} {}", self.ttl, self.rtype, self.addr)
    }
}

//------------ Answer ---------------------------------------------------------

/// The full set of address records for a query key.
///
/// Callers always receive their own copy; the cached original is never
/// handed out mutably.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Answer {
    /// The records, in backend order.
    records: Vec<AddressRecord>,
}

impl Answer {
    /// Creates an answer from a set of records.
    pub fn new(records: Vec<AddressRecord>) -> Self {
        Self { records }
    }

    /// Returns the records.
    pub fn records(&self) -> &[AddressRecord] {
        &self.records
    }

    /// Returns whether the answer has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns a new answer with only the records of the given type.
    pub fn of_type(&self, rtype: RecordType) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|record| record.rtype() == rtype)
                .copied()
                .collect(),
        }
    }

    /// Returns the smallest TTL in the answer, if any.
    ///
    /// This is the value a DNS frontend should put on the response as a
    /// whole.
    pub fn min_ttl(&self) -> Option<Ttl> {
        self.records.iter().map(AddressRecord::ttl).min()
    }
}

//------------ Resolved -------------------------------------------------------

/// A successful resolution.
#[derive(Clone, Debug)]
pub struct Resolved {
    /// The answer.
    pub answer: Answer,

    /// Whether the answer came from a cache entry past its freshness
    /// window. Stale answers are served when the backend is unavailable;
    /// see [RFC 8767](https://www.rfc-editor.org/info/rfc8767).
    pub stale: bool,
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str, ttl: u32) -> AddressRecord {
        AddressRecord::new(s.parse().unwrap(), Ttl::from_secs(ttl))
    }

    fn v6(s: &str, ttl: u32) -> AddressRecord {
        AddressRecord::new(s.parse().unwrap(), Ttl::from_secs(ttl))
    }

    #[test]
    fn record_type_follows_address_family() {
        assert_eq!(v4("203.0.113.5", 60).rtype(), RecordType::A);
        assert_eq!(v6("2001:db8::1", 60).rtype(), RecordType::Aaaa);
    }

    #[test]
    fn of_type_filters() {
        let answer =
            Answer::new(vec![v4("203.0.113.5", 60), v6("2001:db8::1", 60)]);
        let a_only = answer.of_type(RecordType::A);
        assert_eq!(a_only.len(), 1);
        assert_eq!(a_only.records()[0].rtype(), RecordType::A);
        let aaaa_only = answer.of_type(RecordType::Aaaa);
        assert_eq!(aaaa_only.len(), 1);
    }

    #[test]
    fn min_ttl() {
        let answer =
            Answer::new(vec![v4("203.0.113.5", 300), v4("203.0.113.6", 60)]);
        assert_eq!(answer.min_ttl(), Some(Ttl::from_secs(60)));
        assert_eq!(Answer::new(Vec::new()).min_ttl(), None);
    }

    #[test]
    fn display() {
        assert_eq!(
            v4("203.0.113.5", 60).to_string(),
            "60 IN A 203.0.113.5"
        );
    }
}
