//! The result cache.
//!
//! This module stores the last known-good answer per query key. The cache
//! has one unusual property that the whole design leans on: entries are
//! never evicted for being stale. An entry past its freshness window no
//! longer satisfies a query directly, but during a backend outage it is
//! the only answer there is, and stale-but-present is strictly preferable
//! to absent. Entries leave the cache only under capacity pressure
//! (least-recently-used first) or through explicit invalidation.
//!
//! A failed refresh never touches an existing entry; only a successful
//! lookup overwrites it.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::answer::Answer;
use crate::clock::{Clock, Elapsed, SystemClock};
use crate::key::QueryKey;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

//------------ ResultCache ----------------------------------------------------

/// A bounded cache of last known-good answers.
///
/// Cloning is cheap and clones share the underlying store. Safe for many
/// concurrent readers and writers.
#[derive(Clone)]
pub struct ResultCache<C: Clock = SystemClock> {
    /// The store. No time-to-live is configured on it; staleness is
    /// tracked per entry so stale entries survive until capacity
    /// pressure or invalidation.
    cache: Cache<QueryKey, Arc<Entry<C>>>,

    /// The freshness window applied to new entries.
    freshness: Duration,

    /// The clock used to timestamp entries.
    clock: C,
}

impl<C: Clock + Send + Sync + 'static> ResultCache<C> {
    /// Creates a new cache.
    pub fn new(max_entries: u64, freshness: Duration, clock: C) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
            freshness,
            clock,
        }
    }

    /// Looks up the entry for a key, fresh or stale.
    ///
    /// Counts as use for eviction purposes.
    pub fn get(&self, key: &QueryKey) -> Option<Arc<Entry<C>>> {
        self.cache.get(key)
    }

    /// Stores the answer for a key.
    ///
    /// Always overwrites an existing entry and restarts its freshness
    /// window.
    pub fn put(&self, key: &QueryKey, answer: Answer) {
        trace!(%key, records = answer.len(), "caching answer");
        let entry = Arc::new(Entry {
            answer,
            obtained_at: self.clock.now(),
            freshness: self.freshness,
        });
        self.cache.insert(key.clone(), entry);
    }

    /// Removes the entry for a key.
    pub fn invalidate(&self, key: &QueryKey) {
        trace!(%key, "invalidating cache entry");
        self.cache.invalidate(key);
    }

    /// Returns the number of entries.
    ///
    /// Flushes the store's internal buffers first so pending inserts and
    /// evictions are applied.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// Returns whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock> Debug for ResultCache<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("ResultCache")
            .field("entries", &self.cache.entry_count())
            .field("freshness", &self.freshness)
            .finish()
    }
}

//------------ Entry ----------------------------------------------------------

/// A cached answer plus the metadata needed to judge its freshness.
#[derive(Debug)]
pub struct Entry<C: Clock> {
    /// The answer.
    answer: Answer,

    /// When the answer was obtained from the backend.
    obtained_at: C::Instant,

    /// The freshness window the entry was stored with.
    freshness: Duration,
}

impl<C: Clock> Entry<C> {
    /// Returns the cached answer.
    pub fn answer(&self) -> &Answer {
        &self.answer
    }

    /// Returns whether the entry is still within its freshness window.
    pub fn is_fresh(&self) -> bool {
        self.obtained_at.elapsed() <= self.freshness
    }

    /// Returns how long ago the answer was obtained.
    pub fn age(&self) -> Duration {
        self.obtained_at.elapsed()
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::{AddressRecord, Ttl};
    use crate::clock::FakeClock;

    fn answer(addr: &str) -> Answer {
        Answer::new(vec![AddressRecord::new(
            addr.parse().unwrap(),
            Ttl::from_secs(60),
        )])
    }

    fn key(name: &str) -> QueryKey {
        QueryKey::new(name).unwrap()
    }

    fn cache(max_entries: u64) -> (ResultCache<FakeClock>, FakeClock) {
        let clock = FakeClock::new();
        let cache = ResultCache::new(
            max_entries,
            Duration::from_secs(60),
            clock.clone(),
        );
        (cache, clock)
    }

    #[test]
    fn entries_age_into_staleness_but_remain() {
        let (cache, clock) = cache(10);
        let key = key("host.example.com");
        cache.put(&key, answer("203.0.113.5"));

        let entry = cache.get(&key).unwrap();
        assert!(entry.is_fresh());

        clock.advance(Duration::from_secs(120));
        let entry = cache.get(&key).unwrap();
        assert!(!entry.is_fresh());
        assert_eq!(entry.age(), Duration::from_secs(120));
        assert_eq!(entry.answer(), &answer("203.0.113.5"));
    }

    #[test]
    fn put_overwrites_and_resets_freshness() {
        let (cache, clock) = cache(10);
        let key = key("host.example.com");
        cache.put(&key, answer("203.0.113.5"));
        clock.advance(Duration::from_secs(120));
        assert!(!cache.get(&key).unwrap().is_fresh());

        cache.put(&key, answer("203.0.113.6"));
        let entry = cache.get(&key).unwrap();
        assert!(entry.is_fresh());
        assert_eq!(entry.answer(), &answer("203.0.113.6"));
    }

    #[test]
    fn invalidate_removes() {
        let (cache, _) = cache(10);
        let key = key("host.example.com");
        cache.put(&key, answer("203.0.113.5"));
        cache.invalidate(&key);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let (cache, _) = cache(2);
        let first = key("first.example.com");
        let second = key("second.example.com");
        let third = key("third.example.com");

        cache.put(&first, answer("203.0.113.1"));
        cache.put(&second, answer("203.0.113.2"));
        assert_eq!(cache.len(), 2);

        // Touch `first` so `second` is the oldest.
        cache.get(&first);
        cache.put(&third, answer("203.0.113.3"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&second).is_none());
        assert!(cache.get(&first).is_some());
        assert!(cache.get(&third).is_some());
    }

    #[test]
    fn staleness_alone_never_evicts() {
        let (cache, clock) = cache(10);
        let key = key("host.example.com");
        cache.put(&key, answer("203.0.113.5"));
        clock.advance(Duration::from_secs(7 * 24 * 3600));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key).is_some());
    }
}
