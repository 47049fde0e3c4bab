//! # Transition listener trait.
//!
//! Provides [`Listen`], the extension point for reacting to committed transitions.
//! Any `Fn(&Transition) + Send + Sync + 'static` closure is a listener.
//!
//! ## Rules
//! - Listeners run **synchronously**, inside the supervisor's evaluation pass,
//!   after the transition is committed and before the next one is computed.
//! - A listener may call back into the supervisor (`start`, `stop`, `subscribe`...);
//!   the command is applied once the current notification round finishes.
//! - Panics are caught and logged; remaining listeners still run.
//!
//! ## Example
//! ```rust
//! use servicevisor::{Listen, ServiceState, Transition};
//!
//! struct Alerts;
//!
//! impl Listen for Alerts {
//!     fn on_transition(&self, t: &Transition) {
//!         if t.to == ServiceState::Failed {
//!             // page somebody
//!         }
//!     }
//!     fn name(&self) -> &'static str { "alerts" }
//! }
//! ```

use crate::events::Transition;

/// Synchronous transition listener.
///
/// Keep `on_transition` short: it delays the supervisor's next step.
pub trait Listen: Send + Sync + 'static {
    /// Handles one committed transition.
    fn on_transition(&self, transition: &Transition);

    /// Returns the listener name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which is verbose for closures.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> Listen for F
where
    F: Fn(&Transition) + Send + Sync + 'static,
{
    fn on_transition(&self, transition: &Transition) {
        self(transition)
    }
}
