//! Error types used by the servicevisor runtime.
//!
//! - [`ConfigError`]: invalid construction arguments; raised synchronously before
//!   any lifecycle activity starts.
//! - [`NotReadyError`]: a guarded service call was attempted outside
//!   [`ServiceState::Ready`].
//!
//! Hook failures are never returned from commands. They surface as the failure
//! reason of the supervisor ([`Failure`]) and through its transition feed.

use std::sync::Arc;

use thiserror::Error;

use crate::core::ServiceState;

/// Captured error describing the most recent fault of a service.
///
/// Shared rather than owned so it can travel with every transition event.
pub type Failure = Arc<anyhow::Error>;

/// # Errors produced while configuring supervisors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The service name is empty or whitespace only.
    #[error("service name must not be empty")]
    EmptyName,

    /// Two declarations share the same name.
    #[error("service {name:?} is declared more than once")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// A declaration depends on a name that is not declared.
    #[error("service {service:?} depends on unknown service {dependency:?}")]
    UnknownDependency {
        /// Declaring service.
        service: String,
        /// Missing dependency.
        dependency: String,
    },

    /// A declaration lists the same dependency more than once.
    #[error("service {service:?} depends on {dependency:?} more than once")]
    DuplicateDependency {
        /// Declaring service.
        service: String,
        /// Repeated dependency.
        dependency: String,
    },

    /// Declarations form a dependency cycle.
    #[error("dependency cycle: {}", path.join(" -> "))]
    DependencyCycle {
        /// Names along the cycle; the first name is repeated at the end.
        path: Vec<String>,
    },

    /// A duration option is negative.
    #[error(
        "option {option:?} of service {service:?} must be a non-negative duration, got {value}"
    )]
    NegativeDuration {
        /// Declaring service.
        service: String,
        /// Offending option key.
        option: &'static str,
        /// Value as written.
        value: i64,
    },

    /// A manifest could not be parsed (syntax, wrong types, unknown keys).
    #[error("invalid service manifest: {0}")]
    Manifest(#[from] toml::de::Error),

    /// A service body was requested for a name the manifest does not declare.
    #[error("no service body supplied for {name:?}")]
    MissingService {
        /// Declared name without a body.
        name: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::ConfigError;
    ///
    /// assert_eq!(ConfigError::EmptyName.as_label(), "config_empty_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::EmptyName => "config_empty_name",
            ConfigError::DuplicateName { .. } => "config_duplicate_name",
            ConfigError::UnknownDependency { .. } => "config_unknown_dependency",
            ConfigError::DuplicateDependency { .. } => "config_duplicate_dependency",
            ConfigError::DependencyCycle { .. } => "config_dependency_cycle",
            ConfigError::NegativeDuration { .. } => "config_negative_duration",
            ConfigError::Manifest(_) => "config_manifest",
            ConfigError::MissingService { .. } => "config_missing_service",
        }
    }
}

/// # A guarded operation was invoked while the service was not ready.
///
/// Carries the observed state so callers can tell "still starting" apart from
/// "failed".
#[derive(Error, Debug, Clone)]
#[error("service {service:?} is not ready (state: {state})")]
pub struct NotReadyError {
    /// Name of the supervised service.
    pub service: Arc<str>,
    /// State observed when the call was rejected.
    pub state: ServiceState,
    /// Failure reason at the time of the call, if any.
    pub failure: Option<Failure>,
}

impl NotReadyError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        "service_not_ready"
    }

    /// Returns `true` if the service is on its way up and a retry may succeed soon.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.state,
            ServiceState::NotInitialized
                | ServiceState::WaitingDependencies
                | ServiceState::Initializing
                | ServiceState::Starting
        )
    }
}
