//! Engine configuration.
//!
//! All operational parameters of the engine are carried here and injected
//! at construction time. Values set through the `set_*` methods are
//! clamped into a sane range. Loading these values from a configuration
//! file is the embedding application's business.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::cmp;
use std::time::Duration;

//------------ Configuration Constants ----------------------------------------

/// Limits for the maximum number of cache entries.
const MAX_CACHE_ENTRIES: DefMinMax<u64> = DefMinMax::new(1_000, 1, 1_000_000);

/// Limits for the freshness window of cache entries.
const FRESHNESS_WINDOW: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(60),
    Duration::from_secs(1),
    Duration::from_secs(7 * 24 * 3600),
);

/// Limits for the transient-failure attempt budget.
const MAX_ATTEMPTS: DefMinMax<u32> = DefMinMax::new(3, 1, 10);

/// Limits for the base backoff delay.
const BASE_DELAY: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_millis(100),
    Duration::from_millis(1),
    Duration::from_secs(10),
);

/// Limits for the backoff delay cap.
const MAX_DELAY: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(5),
    Duration::from_millis(1),
    Duration::from_secs(60),
);

/// Limits for the per-round-trip lookup deadline.
const LOOKUP_TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(5),
    Duration::from_millis(1),
    Duration::from_secs(60),
);

//------------ Config ---------------------------------------------------------

/// Configuration of a resolution engine.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of cache entries before LRU eviction starts.
    max_cache_entries: u64,

    /// How long a cache entry counts as fresh.
    freshness_window: Duration,

    /// Total backend calls allowed for transient failures.
    max_attempts: u32,

    /// Delay before the first transient retry.
    base_delay: Duration,

    /// Upper bound on any single backoff delay.
    max_delay: Duration,

    /// Deadline for a single backend round trip.
    lookup_timeout: Duration,
}

impl Config {
    /// Creates a new config with default values.
    ///
    /// The default values are documented at the relevant set_* methods.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the maximum number of cache entries.
    pub fn max_cache_entries(&self) -> u64 {
        self.max_cache_entries
    }

    /// Sets the maximum number of cache entries.
    ///
    /// Once the ceiling is reached the least-recently-used entry is
    /// evicted. The value has to be at least one, at most 1,000,000 and
    /// the default is 1000.
    pub fn set_max_cache_entries(&mut self, value: u64) {
        self.max_cache_entries = MAX_CACHE_ENTRIES.limit(value)
    }

    /// Returns the freshness window.
    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Sets the freshness window.
    ///
    /// A cache entry older than this is stale: it no longer satisfies a
    /// query directly but is still served as a fallback when the backend
    /// is unavailable. The value has to be at least one second, at most
    /// one week and the default is 60 seconds.
    pub fn set_freshness_window(&mut self, value: Duration) {
        self.freshness_window = FRESHNESS_WINDOW.limit(value)
    }

    /// Returns the transient-failure attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sets the transient-failure attempt budget.
    ///
    /// This counts total backend calls, not retries. The value has to be
    /// at least 1, at most 10 and the default is 3.
    pub fn set_max_attempts(&mut self, value: u32) {
        self.max_attempts = MAX_ATTEMPTS.limit(value)
    }

    /// Returns the base backoff delay.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Sets the base backoff delay.
    ///
    /// The delay doubles with every further transient retry. The value
    /// has to be at least one millisecond, at most 10 seconds and the
    /// default is 100 milliseconds.
    pub fn set_base_delay(&mut self, value: Duration) {
        self.base_delay = BASE_DELAY.limit(value)
    }

    /// Returns the backoff delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Sets the backoff delay cap.
    ///
    /// The value has to be at least one millisecond, at most 60 seconds
    /// and the default is five seconds.
    pub fn set_max_delay(&mut self, value: Duration) {
        self.max_delay = MAX_DELAY.limit(value)
    }

    /// Returns the per-round-trip lookup deadline.
    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// Sets the per-round-trip lookup deadline.
    ///
    /// The value has to be at least one millisecond, at most 60 seconds
    /// and the default is five seconds.
    pub fn set_lookup_timeout(&mut self, value: Duration) {
        self.lookup_timeout = LOOKUP_TIMEOUT.limit(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_entries: MAX_CACHE_ENTRIES.default(),
            freshness_window: FRESHNESS_WINDOW.default(),
            max_attempts: MAX_ATTEMPTS.default(),
            base_delay: BASE_DELAY.default(),
            max_delay: MAX_DELAY.default(),
            lookup_timeout: LOOKUP_TIMEOUT.default(),
        }
    }
}

//------------ DefMinMax ------------------------------------------------------

/// The default, minimum, and maximum values for a config variable.
#[derive(Clone, Copy)]
struct DefMinMax<T> {
    /// The default value,
    def: T,

    /// The minimum value,
    min: T,

    /// The maximum value,
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    fn default(self) -> T {
        self.def
    }

    /// Trims the given value to fit into the minimum/maximum range.
    fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new();
        assert_eq!(config.max_cache_entries(), 1_000);
        assert_eq!(config.freshness_window(), Duration::from_secs(60));
        assert_eq!(config.max_attempts(), 3);
    }

    #[test]
    fn values_are_clamped() {
        let mut config = Config::new();
        config.set_max_cache_entries(0);
        assert_eq!(config.max_cache_entries(), 1);
        config.set_max_attempts(100);
        assert_eq!(config.max_attempts(), 10);
        config.set_freshness_window(Duration::ZERO);
        assert_eq!(config.freshness_window(), Duration::from_secs(1));
    }
}
