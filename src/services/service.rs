//! # Service abstraction.
//!
//! A [`Service`] is the unit a [`Supervisor`](crate::Supervisor) drives. It exposes
//! up to four lifecycle hooks plus an optional keep-alive probe. Each hook returns
//! `Option<HookFuture>`:
//! - `None` means the hook is **absent**; the supervisor treats the state as
//!   instantly successful and moves on without yielding;
//! - `Some(fut)` is awaited exactly once, off the caller's stack.
//!
//! # Example
//! ```
//! use servicevisor::{HookFuture, Service, ServiceContext};
//!
//! struct Cache;
//!
//! impl Service for Cache {
//!     fn start(&self, _ctx: ServiceContext) -> Option<HookFuture> {
//!         Some(Box::pin(async {
//!             // warm up...
//!             Ok(())
//!         }))
//!     }
//! }
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::core::Hook;
use crate::services::ServiceContext;

/// Future returned by a present hook.
pub type HookFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Shared handle to a service body.
pub type ServiceRef = Arc<dyn Service>;

/// Lifecycle hooks of a supervised service. All of them are optional.
pub trait Service: Send + Sync + 'static {
    /// One-time initialization. Failure is terminal (`InitializeFailed`).
    fn init(&self, _ctx: ServiceContext) -> Option<HookFuture> {
        None
    }

    /// Brings the service up. Failure leads to `Stopping` → `Failed`.
    fn start(&self, _ctx: ServiceContext) -> Option<HookFuture> {
        None
    }

    /// Releases what `start` acquired. Failure is logged only.
    fn stop(&self, _ctx: ServiceContext) -> Option<HookFuture> {
        None
    }

    /// Releases what `init` acquired. Failure is logged only.
    fn dispose(&self, _ctx: ServiceContext) -> Option<HookFuture> {
        None
    }

    /// Periodic health probe while `Ready`, armed only when
    /// [`SupervisorConfig::keep_alive_interval`](crate::SupervisorConfig::keep_alive_interval)
    /// is non-zero. An error is reported as a failure.
    fn keep_alive(&self, _ctx: ServiceContext) -> Option<HookFuture> {
        None
    }
}

/// Dispatches a lifecycle hook by kind.
pub(crate) fn call_hook(
    service: &dyn Service,
    hook: Hook,
    ctx: ServiceContext,
) -> Option<HookFuture> {
    match hook {
        Hook::Init => service.init(ctx),
        Hook::Start => service.start(ctx),
        Hook::Stop => service.stop(ctx),
        Hook::Dispose => service.dispose(ctx),
    }
}
