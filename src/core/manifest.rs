//! # Declarative service options.
//!
//! A [`ServiceManifest`] is a TOML document with one table per service:
//!
//! ```toml
//! [services.db]
//! restart_interval_ms = 5000
//!
//! [services.api]
//! depends_on = ["db"]
//! keep_alive_interval_ms = 10000
//! ```
//!
//! Unknown keys are rejected, durations must be non-negative integers (milliseconds).
//! Service bodies are supplied separately, by name, to
//! [`ServiceRegistryBuilder::from_manifest`](crate::ServiceRegistryBuilder::from_manifest).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::core::{Supervisor, SupervisorConfig};
use crate::error::ConfigError;

/// Options of one declared service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceOptions {
    /// Names of the services that must be `Ready` first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Cooldown in `Failed`, in milliseconds (default 60 000).
    #[serde(default)]
    pub restart_interval_ms: Option<i64>,
    /// Keep-alive period in milliseconds (`0` or absent = disabled).
    #[serde(default)]
    pub keep_alive_interval_ms: Option<i64>,
    /// Transition feed capacity.
    #[serde(default)]
    pub feed_capacity: Option<usize>,
}

impl ServiceOptions {
    /// Options with no dependencies and default timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dependency by name.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Sets the restart cooldown.
    pub fn restart_interval(mut self, interval: Duration) -> Self {
        self.restart_interval_ms = Some(millis(interval));
        self
    }

    /// Sets the keep-alive period.
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval_ms = Some(millis(interval));
        self
    }

    /// Resolves the options into a [`SupervisorConfig`] for `service`.
    pub(crate) fn to_config(
        &self,
        service: &str,
        depends_on: Vec<Supervisor>,
    ) -> Result<SupervisorConfig, ConfigError> {
        let mut cfg = SupervisorConfig {
            depends_on,
            ..SupervisorConfig::default()
        };
        if let Some(ms) = self.restart_interval_ms {
            cfg.restart_interval = duration(service, "restart_interval_ms", ms)?;
        }
        if let Some(ms) = self.keep_alive_interval_ms {
            cfg.keep_alive_interval = duration(service, "keep_alive_interval_ms", ms)?;
        }
        if let Some(capacity) = self.feed_capacity {
            cfg.feed_capacity = capacity;
        }
        Ok(cfg)
    }
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn duration(service: &str, option: &'static str, ms: i64) -> Result<Duration, ConfigError> {
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::NegativeDuration {
            service: service.to_string(),
            option,
            value: ms,
        })
}

/// Set of service declarations keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceManifest {
    /// Declarations, keyed by service name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceOptions>,
}

impl ServiceManifest {
    /// Parses a manifest from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
