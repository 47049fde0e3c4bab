//! # Hook context.
//!
//! [`ServiceContext`] is handed to every hook invocation. It lets the service body
//! report faults detected outside the hook call stack (a dropped connection,
//! a background worker dying) back to its supervisor.

use std::sync::{Arc, Weak};

use crate::core::Shared;

/// Per-invocation handle given to service hooks.
///
/// Holds only a weak reference: keeping a context alive does not keep the
/// supervisor alive.
#[derive(Clone)]
pub struct ServiceContext {
    name: Arc<str>,
    shared: Weak<Shared>,
}

impl ServiceContext {
    pub(crate) fn new(name: Arc<str>, shared: Weak<Shared>) -> Self {
        Self { name, shared }
    }

    /// Name of the supervised service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports a fault to the supervisor.
    ///
    /// Same semantics as [`Supervisor::report_failure`](crate::Supervisor::report_failure).
    /// Does nothing once the supervisor is gone.
    pub fn report_failure(&self, err: impl Into<anyhow::Error>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.report_failure(err.into());
        }
    }

    /// Returns `true` while the supervisor still exists.
    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("name", &self.name)
            .field("attached", &self.is_attached())
            .finish()
    }
}
