//! # servicevisor
//!
//! **Servicevisor** drives long-lived in-process services (database pools, caches,
//! API clients, ...) through a uniform lifecycle: dependency gating, initialization,
//! start/stop, fault detection, timed automatic restart and disposal.
//!
//! Each service is wrapped by a [`Supervisor`] that owns its state machine. Supervisors
//! observe each other through dependency links and publish every committed transition
//! to synchronous listeners and an async feed.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Service    │   │   Service    │   │   Service    │
//!     │  (db hooks)  │   │(cache hooks) │   │ (api hooks)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Supervisor  │◄──┤  Supervisor  │◄──┤  Supervisor  │   ◄── depends_on
//!     │     "db"     │   │   "cache"    │   │    "api"     │       (observe only)
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ commit(Transition)                   │
//!            ├──► ListenerSet (sync, in order) ─► DependencyTracker of dependents,
//!            │                                     user listeners, LogWriter
//!            └──► Feed (tokio broadcast) ─► events(), wait_for()
//! ```
//!
//! ### Lifecycle
//! ```text
//! NotInitialized ─► WaitingDependencies ─► Initializing ─► Stopped ─► Starting ─► Ready
//!                                               │            ▲                      │
//!                                               ▼            │ (restart timer)      ▼
//!                                        InitializeFailed  Failed ◄──────────── Stopping
//!
//! dispose() from any resting state: ... ─► Disposing ─► Disposed
//! ```
//!
//! - A hook is optional; an absent hook is an instant success.
//! - At most one hook runs per supervisor; commands never cancel it.
//! - Faults (hook errors, [`Supervisor::report_failure`], failed keep-alive probes) always go
//!   through `Stopping` so the `stop` hook can release resources.
//! - `InitializeFailed` is never retried automatically.
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Supervision**   | Lifecycle state machine for one service.                     | [`Supervisor`], [`ServiceState`]           |
//! | **Services**      | Hooks as a trait or as closures.                             | [`Service`], [`ServiceFn`]                 |
//! | **Listener API**  | Synchronous transition callbacks.                            | [`Listen`], [`Subscription`]               |
//! | **Registry**      | Named supervisors built from declarations, cycle-checked.    | [`ServiceRegistry`], [`ServiceManifest`]   |
//! | **Errors**        | Typed configuration and readiness errors.                    | [`ConfigError`], [`NotReadyError`]         |
//! | **Configuration** | Per-supervisor settings.                                     | [`SupervisorConfig`]                       |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] listener backed by `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use servicevisor::{ServiceFn, ServiceState, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Supervisor::builder(
//!         "db",
//!         ServiceFn::new()
//!             .on_start(|_ctx| async {
//!                 tokio::time::sleep(Duration::from_millis(10)).await;
//!                 Ok(())
//!             })
//!             .arc(),
//!     )
//!     .restart_interval(Duration::from_secs(5))
//!     .build()?;
//!
//!     let api = Supervisor::builder("api", ServiceFn::new().arc())
//!         .depends_on(&db)
//!         .build()?;
//!     assert_eq!(api.state(), ServiceState::WaitingDependencies);
//!
//!     api.wait_for(ServiceState::Ready).await;
//!     api.guard(|| println!("serving"))?;
//!
//!     api.dispose();
//!     db.dispose();
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod listeners;
mod services;

// ---- Public re-exports ----

pub use core::{
    DEFAULT_FEED_CAPACITY, DEFAULT_RESTART_INTERVAL, Hook, ServiceManifest, ServiceOptions,
    ServiceRegistry, ServiceRegistryBuilder, ServiceState, ServiceStatus, Supervisor,
    SupervisorBuilder, SupervisorConfig,
};
pub use error::{ConfigError, Failure, NotReadyError};
pub use events::Transition;
pub use listeners::{Listen, ListenerSet, Subscription};
pub use services::{HookFuture, Service, ServiceContext, ServiceFn, ServiceRef};

// Optional: expose a simple built-in logging listener.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;
