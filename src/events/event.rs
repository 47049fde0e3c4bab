//! # Committed state transitions.
//!
//! A [`Transition`] is produced every time a supervisor commits a state change.
//! It is handed synchronously to listeners and then broadcast on the
//! supervisor's [`Feed`](crate::events::Feed).
//!
//! ## Ordering guarantees
//! Each transition has a globally unique sequence number (`seq`) that increases
//! monotonically across all supervisors of the process. Transitions of one
//! supervisor are always delivered in commit order.
//!
//! ## Example
//! ```rust
//! use servicevisor::{ServiceState, Transition};
//!
//! let t = Transition::new("db", ServiceState::Ready, ServiceState::Stopping);
//! assert_eq!(t.service.as_ref(), "db");
//! assert!(t.failure.is_none());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::ServiceState;
use crate::error::Failure;

/// Global sequence counter for transition ordering.
static TRANSITION_SEQ: AtomicU64 = AtomicU64::new(0);

/// One committed state change of a supervisor.
#[derive(Clone, Debug)]
pub struct Transition {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp of the commit.
    pub at: SystemTime,
    /// Name of the supervised service.
    pub service: Arc<str>,
    /// State left.
    pub from: ServiceState,
    /// State entered.
    pub to: ServiceState,
    /// Failure associated with the entered state.
    ///
    /// Set for `Stopping` en route to `Failed`, for `Failed`, and for
    /// `InitializeFailed` (the `init` error).
    pub failure: Option<Failure>,
}

impl Transition {
    /// Creates a transition stamped with the current time and next sequence number.
    pub fn new(service: impl Into<Arc<str>>, from: ServiceState, to: ServiceState) -> Self {
        Self {
            seq: TRANSITION_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            service: service.into(),
            from,
            to,
            failure: None,
        }
    }

    /// Attaches a failure.
    #[inline]
    pub fn with_failure(mut self, failure: Option<Failure>) -> Self {
        self.failure = failure;
        self
    }

    /// Returns `true` if the service became ready with this transition.
    #[inline]
    pub fn entered_ready(&self) -> bool {
        self.to == ServiceState::Ready && self.from != ServiceState::Ready
    }

    /// Returns `true` if the service stopped being ready with this transition.
    #[inline]
    pub fn left_ready(&self) -> bool {
        self.from == ServiceState::Ready && self.to != ServiceState::Ready
    }
}
