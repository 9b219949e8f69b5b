//! A time interface that can be replaced by a fake implementation in tests.
//!
//! Cache freshness is computed exclusively through this seam so that tests
//! can age entries without sleeping.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use std::time;
use std::time::Duration;

//------------ Clock ----------------------------------------------------------

/// A source of instants that can report elapsed time.
pub trait Clock: Clone {
    /// The instant type produced by this clock.
    type Instant: Clone + Debug + Elapsed + Send + Sync;

    /// Creates a new instance of the clock.
    fn new() -> Self;

    /// Records the current time.
    fn now(&self) -> Self::Instant;
}

//------------ Elapsed --------------------------------------------------------

/// Reports the time that has passed since an instant was recorded.
pub trait Elapsed {
    /// Returns the elapsed time.
    fn elapsed(&self) -> Duration;
}

//------------ SystemClock ----------------------------------------------------

/// The [Clock] implementation backed by [std::time::Instant].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = time::Instant;

    fn new() -> Self {
        Self
    }

    fn now(&self) -> Self::Instant {
        Self::Instant::now()
    }
}

impl Elapsed for time::Instant {
    fn elapsed(&self) -> Duration {
        self.elapsed()
    }
}

//------------ FakeClock ------------------------------------------------------

/// A [Clock] whose time only moves when a test advances it.
#[derive(Clone, Debug)]
pub struct FakeClock {
    /// The current fake time as an offset from the clock's creation.
    now: Arc<Mutex<Duration>>,
}

impl FakeClock {
    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = now.saturating_add(by);
    }

    /// Returns the current fake time.
    fn current(&self) -> Duration {
        *self.now.lock()
    }
}

impl Clock for FakeClock {
    type Instant = FakeInstant;

    fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    fn now(&self) -> Self::Instant {
        FakeInstant {
            at: self.current(),
            clock: self.clone(),
        }
    }
}

//------------ FakeInstant ----------------------------------------------------

/// An instant recorded from a [FakeClock].
#[derive(Clone, Debug)]
pub struct FakeInstant {
    /// The fake time at which the instant was recorded.
    at: Duration,

    /// The clock it was recorded from.
    clock: FakeClock,
}

impl Elapsed for FakeInstant {
    fn elapsed(&self) -> Duration {
        self.clock.current().saturating_sub(self.at)
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new();
        let instant = clock.now();
        assert_eq!(instant.elapsed(), Duration::ZERO);
        clock.advance(Duration::from_secs(90));
        assert_eq!(instant.elapsed(), Duration::from_secs(90));
    }

    #[test]
    fn instants_share_the_clock() {
        let clock = FakeClock::new();
        let early = clock.now();
        clock.advance(Duration::from_secs(30));
        let late = clock.now();
        clock.advance(Duration::from_secs(30));
        assert_eq!(early.elapsed(), Duration::from_secs(60));
        assert_eq!(late.elapsed(), Duration::from_secs(30));
    }
}
