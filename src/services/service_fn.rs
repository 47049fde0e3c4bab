//! # Closure-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] assembles a [`Service`] from closures, one per hook. Hooks that are
//! never set stay absent. Every invocation creates a **new** future; share state
//! between hooks explicitly through `Arc<...>` captures.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use servicevisor::{ServiceFn, ServiceRef};
//!
//! let svc: ServiceRef = ServiceFn::new()
//!     .on_start(|_ctx| async {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         Ok(())
//!     })
//!     .on_stop(|_ctx| async { Ok(()) })
//!     .arc();
//! # let _ = svc;
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::services::{HookFuture, Service, ServiceContext, ServiceRef};

type HookFn = Arc<dyn Fn(ServiceContext) -> HookFuture + Send + Sync>;

fn boxed<F, Fut>(f: F) -> HookFn
where
    F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Function-backed service implementation.
#[derive(Default, Clone)]
pub struct ServiceFn {
    init: Option<HookFn>,
    start: Option<HookFn>,
    stop: Option<HookFn>,
    dispose: Option<HookFn>,
    keep_alive: Option<HookFn>,
}

impl ServiceFn {
    /// Creates a service with no hooks at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `init` hook.
    pub fn on_init<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.init = Some(boxed(f));
        self
    }

    /// Sets the `start` hook.
    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.start = Some(boxed(f));
        self
    }

    /// Sets the `stop` hook.
    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.stop = Some(boxed(f));
        self
    }

    /// Sets the `dispose` hook.
    pub fn on_dispose<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.dispose = Some(boxed(f));
        self
    }

    /// Sets the keep-alive probe.
    pub fn on_keep_alive<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ServiceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.keep_alive = Some(boxed(f));
        self
    }

    /// Wraps the service into a shared handle.
    pub fn arc(self) -> ServiceRef {
        Arc::new(self)
    }
}

impl Service for ServiceFn {
    fn init(&self, ctx: ServiceContext) -> Option<HookFuture> {
        self.init.as_ref().map(|f| f(ctx))
    }

    fn start(&self, ctx: ServiceContext) -> Option<HookFuture> {
        self.start.as_ref().map(|f| f(ctx))
    }

    fn stop(&self, ctx: ServiceContext) -> Option<HookFuture> {
        self.stop.as_ref().map(|f| f(ctx))
    }

    fn dispose(&self, ctx: ServiceContext) -> Option<HookFuture> {
        self.dispose.as_ref().map(|f| f(ctx))
    }

    fn keep_alive(&self, ctx: ServiceContext) -> Option<HookFuture> {
        self.keep_alive.as_ref().map(|f| f(ctx))
    }
}

impl std::fmt::Debug for ServiceFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceFn")
            .field("init", &self.init.is_some())
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .field("dispose", &self.dispose.is_some())
            .field("keep_alive", &self.keep_alive.is_some())
            .finish()
    }
}
