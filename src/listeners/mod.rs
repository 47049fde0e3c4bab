//! # Transition listeners.
//!
//! Every supervisor keeps an ordered [`ListenerSet`]; callers register with
//! [`Supervisor::subscribe`](crate::Supervisor::subscribe) and receive a
//! [`Subscription`] to remove themselves later.
//!
//! ```text
//! evaluation pass ── commit ──► ListenerSet::notify(&Transition)
//!                                   ├──► listener 1 (closure)
//!                                   ├──► listener 2 (DependencyTracker of a dependent)
//!                                   └──► listener N (LogWriter, ...)
//!                               then ──► Feed::publish (async receivers)
//! ```

mod listener;
mod listener_set;
#[cfg(feature = "logging")]
mod log;

pub use listener::Listen;
pub use listener_set::{ListenerSet, Subscription};
#[cfg(feature = "logging")]
pub use log::LogWriter;
