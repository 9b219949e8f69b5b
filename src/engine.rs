//! The resolution engine.
//!
//! The engine answers a query in one pass through a small state machine:
//!
//! ```text
//! CacheCheck -> BackendAttempt -> (Success | Retrying | Fallback | HardFailure)
//! ```
//!
//! A fresh cache entry answers the query outright, with no backend call.
//! Otherwise the query joins the coalescer: one leader per key performs
//! the backend calls while followers wait for its outcome. The leader
//! retries per the [RetryPolicy][crate::retry::RetryPolicy]; once it
//! gives up it serves whatever the cache still holds -- stale included --
//! before admitting failure. A permanent negative answer short-circuits
//! all of that: it is returned as-is, never masked by old cache state.
//!
//! The leader's work runs on its own task, so a caller that gives up
//! waiting does not abort the backend call; the leader always runs to
//! completion and populates the cache for whoever asks next.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::answer::{RecordType, Resolved};
use crate::cache::ResultCache;
use crate::client::SendLookup;
use crate::clock::{Clock, SystemClock};
use crate::coalesce::{Coalescer, Flight};
use crate::config::Config;
use crate::error::{FailureClass, LookupError, ResolveError};
use crate::key::QueryKey;
use crate::retry::{Decision, RetryPolicy};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The outcome of a flight, shared between the leader and its followers.
type Outcome = Result<Resolved, ResolveError>;

//------------ Engine ---------------------------------------------------------

/// A resilient resolution engine.
///
/// Construct one per process from an injected [SendLookup] client and a
/// [Config]; clones share all state. All operational parameters come
/// from the config, nothing is hardcoded.
pub struct Engine<C: Clock = SystemClock> {
    /// The shared engine state.
    inner: Arc<Inner<C>>,
}

impl Engine<SystemClock> {
    /// Creates an engine running on the system clock.
    pub fn new(
        client: Arc<dyn SendLookup + Send + Sync>,
        config: &Config,
    ) -> Self {
        Self::with_clock(client, config, SystemClock::new())
    }
}

impl<C: Clock + Send + Sync + 'static> Engine<C> {
    /// Creates an engine with an explicit clock.
    pub fn with_clock(
        client: Arc<dyn SendLookup + Send + Sync>,
        config: &Config,
        clock: C,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                cache: ResultCache::new(
                    config.max_cache_entries(),
                    config.freshness_window(),
                    clock,
                ),
                retry: RetryPolicy::new(
                    config.max_attempts(),
                    config.base_delay(),
                    config.max_delay(),
                ),
                coalescer: Coalescer::new(),
            }),
        }
    }

    /// Resolves a name to the address records of the requested type.
    ///
    /// Returns [ResolveError::NotFound] when the backend authoritatively
    /// denies the name or when it has no records of the requested type,
    /// and [ResolveError::NoAnswer] when the backend is unavailable and
    /// the cache has nothing to offer.
    pub async fn resolve(
        &self,
        name: &str,
        rtype: RecordType,
    ) -> Result<Resolved, ResolveError> {
        let key = QueryKey::new(name)?;
        let resolved = self.resolve_key(&key).await?;
        let answer = resolved.answer.of_type(rtype);
        if answer.is_empty() {
            return Err(ResolveError::NotFound);
        }
        Ok(Resolved {
            answer,
            stale: resolved.stale,
        })
    }

    /// Resolves a key to its full answer, all record types included.
    pub async fn resolve_key(
        &self,
        key: &QueryKey,
    ) -> Result<Resolved, ResolveError> {
        loop {
            // CacheCheck: a fresh entry is the answer, no backend call.
            if let Some(entry) = self.inner.cache.get(key) {
                if entry.is_fresh() {
                    trace!(%key, "fresh cache hit");
                    return Ok(Resolved {
                        answer: entry.answer().clone(),
                        stale: false,
                    });
                }
                trace!(%key, age = ?entry.age(), "cache entry stale, refreshing");
            }

            // BackendAttempt, through the coalescer.
            let waiter = match self.inner.coalescer.join(key) {
                Flight::Leader(guard) => {
                    let waiter = guard.subscribe();
                    let inner = self.inner.clone();
                    let key = key.clone();
                    // The flight must survive this caller going away, so
                    // the leader work gets its own task.
                    tokio::spawn(async move {
                        let outcome = inner.lead(&key).await;
                        guard.complete(outcome);
                    });
                    waiter
                }
                Flight::Follower(follower) => follower,
            };

            match waiter.outcome().await {
                Some(outcome) => return outcome,
                // The flight was abandoned. Start over; this caller may
                // well become the next leader.
                None => continue,
            }
        }
    }

    /// Drops the cached answer for a key.
    ///
    /// This is the operator-facing invalidation; a failed refresh never
    /// removes an entry.
    pub fn invalidate(&self, key: &QueryKey) {
        self.inner.cache.invalidate(key);
    }

    /// Returns the number of cached answers.
    pub fn cached_entries(&self) -> u64 {
        self.inner.cache.len()
    }
}

impl<C: Clock> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Clock> Debug for Engine<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("Engine")
            .field("cache", &self.inner.cache)
            .field("coalescer", &self.inner.coalescer)
            .finish()
    }
}

//------------ Inner ----------------------------------------------------------

/// The state shared by all clones of an engine.
struct Inner<C: Clock> {
    /// The backend client. One call is one round trip.
    client: Arc<dyn SendLookup + Send + Sync>,

    /// Last known-good answers.
    cache: ResultCache<C>,

    /// Retry rules for backend failures.
    retry: RetryPolicy,

    /// In-flight lookup registry.
    coalescer: Coalescer<Outcome>,
}

impl<C: Clock + Send + Sync + 'static> Inner<C> {
    /// Performs the leader's side of a flight: backend calls, retries,
    /// and the fallback decision.
    async fn lead(&self, key: &QueryKey) -> Outcome {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.client.lookup(key).await {
                Ok(answer) => {
                    // Success: refresh the cache and release everyone.
                    self.cache.put(key, answer.clone());
                    return Ok(Resolved {
                        answer,
                        stale: false,
                    });
                }
                Err(err) => err,
            };

            // HardFailure, directly: a permanent negative answer is
            // never retried and never masked by old cache state. The
            // name is gone; serving a stale address would keep traffic
            // flowing to a decommissioned instance.
            if err.class() == FailureClass::Permanent {
                debug!(%key, "backend says the name does not exist");
                return Err(ResolveError::NotFound);
            }

            // Retrying.
            match self.retry.decide(err.class(), attempt) {
                Decision::RetryNow => {
                    debug!(%key, attempt, %err, "retrying immediately");
                }
                Decision::RetryAfter(delay) => {
                    debug!(%key, attempt, ?delay, %err, "retrying after backoff");
                    tokio::time::sleep(delay).await;
                }
                Decision::GiveUp => return self.fall_back(key, err),
            }
        }
    }

    /// The Fallback state: retries are exhausted, serve whatever the
    /// cache still holds, stale or not.
    fn fall_back(&self, key: &QueryKey, err: LookupError) -> Outcome {
        if let Some(entry) = self.cache.get(key) {
            warn!(
                %key, %err, age = ?entry.age(),
                "backend unavailable, serving cached answer"
            );
            return Ok(Resolved {
                answer: entry.answer().clone(),
                // The entry may have been refreshed by another flight
                // in the meantime; judge it as it is now.
                stale: !entry.is_fresh(),
            });
        }
        warn!(%key, %err, "backend unavailable and nothing cached");
        Err(ResolveError::NoAnswer(err))
    }
}
