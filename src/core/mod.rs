//! Runtime core: the lifecycle state machine and its collaborators.
//!
//! The public API of this module is [`Supervisor`] (with its builder, config and
//! status types), [`ServiceState`]/[`Hook`], and the explicit [`ServiceRegistry`].
//!
//! Internal modules:
//! - [`supervisor`]: core state, flags and the re-entrant evaluation pass;
//! - [`deps`]: dependency readiness tracking through dependency listeners;
//! - [`hooks`]: single-in-flight hook invocation and settlement;
//! - [`timer`]: cancellable restart and keep-alive timers;
//! - [`registry`]: named supervisors built from declarations, with cycle detection;
//! - [`manifest`]: TOML declarations for the registry.

mod builder;
mod config;
mod deps;
pub(crate) mod hooks;
mod manifest;
mod registry;
mod state;
mod supervisor;
mod timer;

#[cfg(test)]
mod tests;

pub use builder::SupervisorBuilder;
pub use config::{DEFAULT_FEED_CAPACITY, DEFAULT_RESTART_INTERVAL, SupervisorConfig};
pub use manifest::{ServiceManifest, ServiceOptions};
pub use registry::{ServiceRegistry, ServiceRegistryBuilder};
pub use state::{Hook, ServiceState};
pub(crate) use supervisor::Shared;
pub use supervisor::{ServiceStatus, Supervisor};
