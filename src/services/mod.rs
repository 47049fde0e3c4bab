//! # Service abstractions.
//!
//! - [`Service`] - trait with optional async lifecycle hooks
//! - [`ServiceFn`] - closure-backed implementation
//! - [`ServiceRef`] - shared reference to a service (`Arc<dyn Service>`)
//! - [`ServiceContext`] - handle passed to hooks (name, failure reporting)

mod context;
mod service;
mod service_fn;

pub use context::ServiceContext;
pub(crate) use service::call_hook;
pub use service::{HookFuture, Service, ServiceRef};
pub use service_fn::ServiceFn;
