//! The retry policy.
//!
//! Given the class of a backend failure and the number of calls already
//! made for a query, the policy decides whether the engine retries
//! immediately, retries after a backoff delay, or gives up and falls back
//! to the cache.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::error::FailureClass;
use std::cmp;
use std::time::Duration;

//------------ Decision -------------------------------------------------------

/// What to do after a failed backend call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Retry without delay.
    RetryNow,

    /// Retry after the given delay.
    RetryAfter(Duration),

    /// Stop calling the backend and fall back to the cache.
    GiveUp,
}

//------------ RetryPolicy ----------------------------------------------------

/// The per-failure-class retry rules.
///
/// `Transient` failures retry with exponential backoff until the attempt
/// budget is spent. `ServerError` retries exactly once, immediately: the
/// backend is reachable, so the retry only exists to absorb a one-off
/// glitch and no backoff is owed. `Permanent` never retries.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total backend calls allowed for transient failures.
    max_attempts: u32,

    /// Delay before the first transient retry; doubles per attempt.
    base_delay: Duration,

    /// Upper bound on any single backoff delay.
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a new policy.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Decides what to do after a failed call.
    ///
    /// `attempt` is the number of backend calls made so far for this
    /// query, counting the one that just failed.
    pub fn decide(&self, class: FailureClass, attempt: u32) -> Decision {
        match class {
            FailureClass::Permanent => Decision::GiveUp,
            FailureClass::ServerError => {
                if attempt < 2 {
                    Decision::RetryNow
                } else {
                    Decision::GiveUp
                }
            }
            FailureClass::Transient => {
                if attempt >= self.max_attempts {
                    return Decision::GiveUp;
                }
                // Cap the shift; delays this large are clamped anyway.
                let exp = cmp::min(attempt.saturating_sub(1), 16);
                let delay = cmp::min(
                    self.base_delay.saturating_mul(1 << exp),
                    self.max_delay,
                );
                Decision::RetryAfter(delay)
            }
        }
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(
            3,
            Duration::from_millis(100),
            Duration::from_millis(250),
        )
    }

    #[rstest]
    #[case(1, Decision::RetryAfter(Duration::from_millis(100)))]
    #[case(2, Decision::RetryAfter(Duration::from_millis(200)))]
    #[case(3, Decision::GiveUp)]
    #[case(4, Decision::GiveUp)]
    fn transient_backs_off_then_gives_up(
        #[case] attempt: u32,
        #[case] expected: Decision,
    ) {
        assert_eq!(
            policy().decide(FailureClass::Transient, attempt),
            expected
        );
    }

    #[test]
    fn transient_delay_is_capped() {
        let policy = RetryPolicy::new(
            8,
            Duration::from_millis(100),
            Duration::from_millis(250),
        );
        assert_eq!(
            policy.decide(FailureClass::Transient, 4),
            Decision::RetryAfter(Duration::from_millis(250))
        );
    }

    #[rstest]
    #[case(1, Decision::RetryNow)]
    #[case(2, Decision::GiveUp)]
    #[case(3, Decision::GiveUp)]
    fn server_error_retries_once(
        #[case] attempt: u32,
        #[case] expected: Decision,
    ) {
        assert_eq!(
            policy().decide(FailureClass::ServerError, attempt),
            expected
        );
    }

    #[test]
    fn permanent_never_retries() {
        assert_eq!(
            policy().decide(FailureClass::Permanent, 1),
            Decision::GiveUp
        );
    }
}
