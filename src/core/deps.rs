//! # Dependency readiness tracking.
//!
//! [`DependencyTracker`] keeps one readiness flag per declared dependency and the
//! number of flags set. The owning supervisor registers a [`DependencyListener`]
//! on every dependency; each transition into or out of `Ready` updates the flag and,
//! when the aggregate `all_ready` flips, triggers one evaluation pass.
//!
//! ## Rules
//! - Strictly an observer: no command is ever issued to a dependency.
//! - Flags are **set**, not incremented, so a notification racing with the initial
//!   state read can never double-count.
//! - Zero dependencies means `all_ready` from the start.

use std::sync::{Arc, Weak};

use crate::core::{ServiceState, Shared, Supervisor};
use crate::events::Transition;
use crate::listeners::{Listen, Subscription};

/// Readiness flags of the declared dependencies.
#[derive(Debug, Default)]
pub(crate) struct DependencyTracker {
    ready: Vec<bool>,
    ready_count: usize,
    subscriptions: Vec<Subscription>,
}

impl DependencyTracker {
    /// Creates a tracker for `total` dependencies, none of them ready yet.
    pub(crate) fn new(total: usize) -> Self {
        Self {
            ready: vec![false; total],
            ready_count: 0,
            subscriptions: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn all_ready(&self) -> bool {
        self.ready_count == self.ready.len()
    }

    #[inline]
    pub(crate) fn ready_count(&self) -> usize {
        self.ready_count
    }

    /// Records the readiness of dependency `index`.
    ///
    /// Returns `true` if `all_ready` changed.
    pub(crate) fn set(&mut self, index: usize, ready: bool) -> bool {
        let before = self.all_ready();
        let Some(flag) = self.ready.get_mut(index) else {
            return false;
        };
        if *flag == ready {
            return false;
        }
        *flag = ready;
        if ready {
            self.ready_count += 1;
        } else {
            self.ready_count -= 1;
        }
        before != self.all_ready()
    }

    pub(crate) fn attach(&mut self, subscriptions: Vec<Subscription>) {
        self.subscriptions = subscriptions;
    }

    /// Stops observing the dependencies.
    pub(crate) fn detach(&mut self) {
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe();
        }
    }
}

/// Listener registered on a dependency on behalf of its dependent.
struct DependencyListener {
    index: usize,
    owner: Weak<Shared>,
}

impl Listen for DependencyListener {
    fn on_transition(&self, t: &Transition) {
        if !(t.entered_ready() || t.left_ready()) {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            owner.dependency_changed(self.index, t.to == ServiceState::Ready);
        }
    }

    fn name(&self) -> &'static str {
        "dependency_tracker"
    }
}

/// Registers one [`DependencyListener`] per dependency, in declaration order.
pub(crate) fn observe(dependencies: &[Supervisor], owner: &Weak<Shared>) -> Vec<Subscription> {
    dependencies
        .iter()
        .enumerate()
        .map(|(index, dep)| {
            dep.shared.listeners.add(Arc::new(DependencyListener {
                index,
                owner: owner.clone(),
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dependencies_are_all_ready() {
        assert!(DependencyTracker::new(0).all_ready());
    }

    #[test]
    fn flips_only_when_aggregate_changes() {
        let mut t = DependencyTracker::new(2);
        assert!(!t.all_ready());
        assert!(!t.set(0, true));
        assert!(!t.set(0, true), "repeated flag is not counted twice");
        assert_eq!(t.ready_count(), 1);
        assert!(t.set(1, true));
        assert!(t.all_ready());
        assert!(t.set(0, false));
        assert!(!t.all_ready());
        assert!(!t.set(1, false));
        assert_eq!(t.ready_count(), 0);
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut t = DependencyTracker::new(1);
        assert!(!t.set(7, true));
        assert_eq!(t.ready_count(), 0);
    }
}
