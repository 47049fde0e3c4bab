//! # Broadcast feed of committed transitions.
//!
//! [`Feed`] is a thin wrapper around [`tokio::sync::broadcast`]. Every supervisor
//! owns one and publishes each [`Transition`] on it right after its synchronous
//! listeners ran.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and needs no runtime.
//! - **Bounded capacity**: a single ring buffer stores recent transitions for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: transitions are lost if there are no receivers at send time.

use tokio::sync::broadcast;

use super::event::Transition;

/// Broadcast channel for transitions of one supervisor.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Feed {
    tx: broadcast::Sender<Transition>,
}

impl Feed {
    /// Creates a new feed with the given capacity (clamped to a minimum of 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Transition>(capacity.max(1));
        Self { tx }
    }

    /// Publishes a transition to all active receivers.
    ///
    /// If there are no receivers the transition is dropped.
    pub fn publish(&self, t: Transition) {
        let _ = self.tx.send(t);
    }

    /// Creates a receiver that observes transitions published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.tx.subscribe()
    }
}
