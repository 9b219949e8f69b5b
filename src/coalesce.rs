//! De-duplication of in-flight lookups.
//!
//! When many callers resolve the same key while the backend is slow or
//! unreachable, only one of them -- the leader -- may actually call the
//! backend; everyone else becomes a follower and waits for the leader's
//! outcome. This bounds backend load during an outage to one in-flight
//! call per distinct key, no matter the request fan-in.
//!
//! The leader holds a [FlightGuard] for the lifetime of its flight.
//! Completing the guard publishes the outcome to all followers and
//! unregisters the key. A guard that is dropped without completing (a
//! panicked leader) closes the channel instead; followers observe the
//! abandonment and can start a flight of their own.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::key::QueryKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::watch;

/// The map of in-flight flights.
type FlightMap<T> = Arc<Mutex<HashMap<QueryKey, watch::Receiver<Option<T>>>>>;

//------------ Coalescer ------------------------------------------------------

/// A registry of in-flight lookups keyed by query key.
///
/// Clones share the registry.
#[derive(Clone)]
pub struct Coalescer<T> {
    /// One channel per key with a lookup in flight. The stored receiver
    /// keeps the channel alive so a leader can always publish.
    flights: FlightMap<T>,
}

impl<T: Clone> Coalescer<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            flights: Default::default(),
        }
    }

    /// Joins the flight for a key, starting one if none is in flight.
    ///
    /// The first caller for a key becomes the leader; concurrent callers
    /// for the same key become followers until the leader's guard is
    /// resolved.
    pub fn join(&self, key: &QueryKey) -> Flight<T> {
        let mut flights = self.flights.lock();
        if let Some(rx) = flights.get(key) {
            return Flight::Follower(Follower { rx: rx.clone() });
        }
        let (tx, rx) = watch::channel(None);
        flights.insert(key.clone(), rx);
        Flight::Leader(FlightGuard {
            key: key.clone(),
            flights: self.flights.clone(),
            tx,
        })
    }

    /// Returns the number of keys with a lookup in flight.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.flights.lock().len()
    }
}

impl<T: Clone> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Coalescer<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("Coalescer")
            .field("in_flight", &self.flights.lock().len())
            .finish()
    }
}

//------------ Flight ---------------------------------------------------------

/// The result of joining a flight.
#[derive(Debug)]
pub enum Flight<T> {
    /// This caller starts the flight and must resolve the guard.
    Leader(FlightGuard<T>),

    /// Another caller already has the flight; await its outcome.
    Follower(Follower<T>),
}

//------------ FlightGuard ----------------------------------------------------

/// The leader's handle on an in-flight lookup.
///
/// The key stays registered for exactly as long as the guard lives.
#[derive(Debug)]
pub struct FlightGuard<T> {
    /// The key this flight is for.
    key: QueryKey,

    /// The registry, for unregistering on drop.
    flights: FlightMap<T>,

    /// The publishing side of the flight's channel.
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> FlightGuard<T> {
    /// Publishes the outcome to all followers and ends the flight.
    pub fn complete(self, outcome: T) {
        // Publish before the drop unregisters the key, so a follower
        // that joined at the last moment still observes the outcome.
        self.tx.send_replace(Some(outcome));
    }

    /// Returns a follower on this leader's own flight.
    ///
    /// The engine's caller-facing task uses this to await the outcome of
    /// leader work running on a separate task.
    pub fn subscribe(&self) -> Follower<T> {
        Follower {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        self.flights.lock().remove(&self.key);
    }
}

//------------ Follower -------------------------------------------------------

/// A waiter on another caller's in-flight lookup.
#[derive(Debug)]
pub struct Follower<T> {
    /// The receiving side of the flight's channel.
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> Follower<T> {
    /// Waits for the flight's outcome.
    ///
    /// Returns `None` if the leader abandoned the flight without
    /// publishing; the caller should start over.
    pub async fn outcome(mut self) -> Option<T> {
        loop {
            if let Some(outcome) = self.rx.borrow_and_update().as_ref() {
                return Some(outcome.clone());
            }
            if self.rx.changed().await.is_err() {
                // Sender gone. One final look in case the outcome was
                // published right before.
                return self.rx.borrow().as_ref().cloned();
            }
        }
    }
}

//============ Tests =========================================================
