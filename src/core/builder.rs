use std::sync::Arc;
use std::time::Duration;

use crate::core::{Supervisor, SupervisorConfig};
use crate::error::ConfigError;
use crate::listeners::Listen;
use crate::services::ServiceRef;

/// Builder for constructing a [`Supervisor`] with optional settings.
///
/// ```rust
/// use std::time::Duration;
/// use servicevisor::{ServiceFn, ServiceState, Supervisor};
///
/// let db = Supervisor::builder("db", ServiceFn::new().arc()).build().unwrap();
/// let api = Supervisor::builder("api", ServiceFn::new().arc())
///     .depends_on(&db)
///     .restart_interval(Duration::from_secs(5))
///     .build()
///     .unwrap();
///
/// assert_eq!(api.state(), ServiceState::Ready);
/// ```
pub struct SupervisorBuilder {
    name: String,
    service: ServiceRef,
    cfg: SupervisorConfig,
    listeners: Vec<Arc<dyn Listen>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with default configuration.
    pub fn new(name: impl Into<String>, service: ServiceRef) -> Self {
        Self {
            name: name.into(),
            service,
            cfg: SupervisorConfig::default(),
            listeners: Vec::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: SupervisorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Adds one dependency.
    pub fn depends_on(mut self, dependency: &Supervisor) -> Self {
        self.cfg.depends_on.push(dependency.clone());
        self
    }

    /// Adds several dependencies, keeping their order.
    pub fn depends_on_all<'a>(mut self, deps: impl IntoIterator<Item = &'a Supervisor>) -> Self {
        self.cfg.depends_on.extend(deps.into_iter().cloned());
        self
    }

    /// Sets the cooldown spent in `Failed`.
    pub fn restart_interval(mut self, interval: Duration) -> Self {
        self.cfg.restart_interval = interval;
        self
    }

    /// Enables keep-alive probing with the given period (`0s` disables it).
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.cfg.keep_alive_interval = interval;
        self
    }

    /// Sets the transition feed capacity.
    pub fn feed_capacity(mut self, capacity: usize) -> Self {
        self.cfg.feed_capacity = capacity;
        self
    }

    /// Registers a listener before the first evaluation pass, so it also sees
    /// the transitions committed during construction.
    pub fn with_listener(mut self, listener: impl Listen) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Builds the supervisor and runs its first evaluation pass.
    pub fn build(self) -> Result<Supervisor, ConfigError> {
        Supervisor::with_listeners(self.name, self.service, self.cfg, self.listeners)
    }
}
