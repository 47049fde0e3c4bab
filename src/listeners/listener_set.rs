//! # Ordered listener registry with panic isolation.
//!
//! Provides [`ListenerSet`] (owned by each supervisor) and [`Subscription`]
//! (the handle returned to callers).
//!
//! ## Rules
//! - **Registration order**: listeners are notified in the order they were added.
//! - **Snapshot per round**: a listener added while a notification round is running
//!   is first called for the next transition.
//! - **Removal is immediate**: a listener removed mid-round is skipped if not yet called.
//! - **Isolation**: a panicking listener is logged; the round continues.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave a listener's own state
//! inconsistent if it panics while holding a lock.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::core::hooks::panic_message;
use crate::events::Transition;
use crate::listeners::Listen;

type Entry = (u64, Arc<dyn Listen>);

#[derive(Default)]
struct Entries {
    next_id: u64,
    items: Vec<Entry>,
}

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered collection of listeners.
#[derive(Default)]
pub struct ListenerSet {
    entries: Arc<Mutex<Entries>>,
}

impl ListenerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener and returns the handle that removes it.
    pub fn add(&self, listener: Arc<dyn Listen>) -> Subscription {
        let mut entries = lock(&self.entries);
        let id = entries.next_id;
        entries.next_id += 1;
        entries.items.push((id, listener));
        Subscription {
            id,
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        lock(&self.entries).items.len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every listener registered at the start of the round, in order.
    ///
    /// The internal lock is never held while a listener runs.
    pub fn notify(&self, transition: &Transition) {
        let snapshot: Vec<Entry> = lock(&self.entries).items.clone();

        for (id, listener) in snapshot {
            let still_registered = lock(&self.entries).items.iter().any(|(i, _)| *i == id);
            if !still_registered {
                continue;
            }
            let call = panic::catch_unwind(AssertUnwindSafe(|| listener.on_transition(transition)));
            if let Err(panic_err) = call {
                let info = panic_message(&*panic_err);
                tracing::error!(
                    service = %transition.service,
                    listener = listener.name(),
                    to = %transition.to,
                    panic = %info,
                    "listener panicked"
                );
            }
        }
    }
}

/// Handle of one registered listener.
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    entries: Weak<Mutex<Entries>>,
}

impl Subscription {
    /// Removes the listener. Calling it again, or after the supervisor is gone, does nothing.
    pub fn unsubscribe(&self) {
        if let Some(entries) = self.entries.upgrade() {
            lock(&entries).items.retain(|(id, _)| *id != self.id);
        }
    }
}
