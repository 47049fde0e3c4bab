//! Transition events: payload type and broadcast feed.
//!
//! ## Contents
//! - [`Transition`] one committed state change with metadata
//! - [`Feed`] thin wrapper over `tokio::sync::broadcast`
//!
//! Publishers are supervisors only. Consumers are synchronous listeners
//! (see [`crate::listeners`]) and async receivers obtained through
//! [`Supervisor::events`](crate::Supervisor::events).

mod bus;
mod event;

pub use bus::Feed;
pub use event::Transition;
