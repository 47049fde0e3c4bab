//! # LogWriter: transition printer
//!
//! A minimal listener that renders every [`Transition`] as one `tracing` line.
//! Use it for tests, demos, or as a template for richer listeners.
//!
//! ## Example output
//! ```text
//! [initializing] service="db"
//! [stopped] service="db"
//! [starting] service="db"
//! [ready] service="db"
//! [stopping] service="db" failure="conn lost"
//! [failed] service="db" failure="conn lost"
//! ```

use crate::events::Transition;
use crate::listeners::Listen;

/// Transition writer listener.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Listen for LogWriter {
    fn on_transition(&self, t: &Transition) {
        match &t.failure {
            Some(failure) => tracing::info!(
                "[{}] service={:?} failure={:?}",
                t.to,
                t.service,
                failure.to_string()
            ),
            None => tracing::info!("[{}] service={:?}", t.to, t.service),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
