//! # Lifecycle states of a supervised service.
//!
//! ```text
//! NotInitialized ─► WaitingDependencies ─► Initializing ─┬─► Stopped ◄──────────────┐
//!                          │                              └─► InitializeFailed       │
//!                          │                                        │                │
//!                          ▼                                        ▼                │
//!                      Disposing ◄──────────────────────────── (dispose)             │
//!                          │                                                         │
//!                          ▼            Stopped ─► Starting ─► Ready ─► Stopping ─┬──┘
//!                      Disposed                       │                  ▲         └─► Failed
//!                                                     └──────────────────┘              │
//!                                                                   (restart timer) ◄───┘
//! ```
//!
//! States that invoke a hook are called **active** ([`ServiceState::hook`]).

use std::fmt;

/// One of the four lifecycle hooks a [`Service`](crate::Service) may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// One-time setup, run from `Initializing`.
    Init,
    /// Brings the service up, run from `Starting`.
    Start,
    /// Releases what `start` acquired, run from `Stopping`.
    Stop,
    /// Final teardown, run from `Disposing`.
    Dispose,
}

impl Hook {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Hook::Init => "init",
            Hook::Start => "start",
            Hook::Stop => "stop",
            Hook::Dispose => "dispose",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Current lifecycle state of a [`Supervisor`](crate::Supervisor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Just constructed; left during the first evaluation pass.
    NotInitialized,
    /// Parked until every dependency reports [`ServiceState::Ready`].
    WaitingDependencies,
    /// `init` hook in flight.
    Initializing,
    /// `init` hook failed. No automatic retry; only `dispose()` leaves this state.
    InitializeFailed,
    /// Initialized and idle.
    Stopped,
    /// `start` hook in flight.
    Starting,
    /// Serving.
    Ready,
    /// `stop` hook in flight.
    Stopping,
    /// Stopped after a fault; waits for the restart timer.
    Failed,
    /// `dispose` hook in flight.
    Disposing,
    /// Terminal.
    Disposed,
}

impl ServiceState {
    /// Every state, in declaration order.
    pub const ALL: [ServiceState; 11] = [
        ServiceState::NotInitialized,
        ServiceState::WaitingDependencies,
        ServiceState::Initializing,
        ServiceState::InitializeFailed,
        ServiceState::Stopped,
        ServiceState::Starting,
        ServiceState::Ready,
        ServiceState::Stopping,
        ServiceState::Failed,
        ServiceState::Disposing,
        ServiceState::Disposed,
    ];

    /// Hook invoked while in this state, if the state is active.
    pub fn hook(&self) -> Option<Hook> {
        match self {
            ServiceState::Initializing => Some(Hook::Init),
            ServiceState::Starting => Some(Hook::Start),
            ServiceState::Stopping => Some(Hook::Stop),
            ServiceState::Disposing => Some(Hook::Dispose),
            _ => None,
        }
    }

    /// Returns `true` once no further transition can happen.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Disposed)
    }

    /// Returns `true` for states that no command other than `dispose()` can leave.
    #[inline]
    pub fn is_dead_end(&self) -> bool {
        matches!(self, ServiceState::InitializeFailed | ServiceState::Disposed)
    }

    /// Returns `true` for the two states in which commands are ignored.
    #[inline]
    pub fn is_disposing(&self) -> bool {
        matches!(self, ServiceState::Disposing | ServiceState::Disposed)
    }

    /// Returns `true` if `self → to` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, to: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, to),
            (NotInitialized, WaitingDependencies)
                | (NotInitialized, Initializing)
                | (WaitingDependencies, Initializing)
                | (WaitingDependencies, Disposing)
                | (Initializing, Stopped)
                | (Initializing, InitializeFailed)
                | (InitializeFailed, Disposing)
                | (Stopped, Disposing)
                | (Stopped, Starting)
                | (Starting, Ready)
                | (Starting, Stopping)
                | (Ready, Stopping)
                | (Stopping, Failed)
                | (Stopping, Stopped)
                | (Failed, Stopped)
                | (Failed, Disposing)
                | (Disposing, Disposed)
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceState::NotInitialized => "not_initialized",
            ServiceState::WaitingDependencies => "waiting_dependencies",
            ServiceState::Initializing => "initializing",
            ServiceState::InitializeFailed => "initialize_failed",
            ServiceState::Stopped => "stopped",
            ServiceState::Starting => "starting",
            ServiceState::Ready => "ready",
            ServiceState::Stopping => "stopping",
            ServiceState::Failed => "failed",
            ServiceState::Disposing => "disposing",
            ServiceState::Disposed => "disposed",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
