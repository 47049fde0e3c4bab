//! # Per-supervisor configuration.
//!
//! Provides [`SupervisorConfig`], the settings a [`Supervisor`] is constructed with.
//!
//! ## Sentinel values
//! - `keep_alive_interval = 0s` → keep-alive probing disabled
//! - `feed_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::core::Supervisor;

/// Default cooldown before a failed service is restarted.
pub const DEFAULT_RESTART_INTERVAL: Duration = Duration::from_secs(60);

/// Default ring size of the transition feed.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// Configuration of one supervisor.
///
/// ## Field semantics
/// - `depends_on`: supervisors that must be `Ready` before this one initializes or starts
/// - `restart_interval`: cooldown spent in `Failed` before returning to `Stopped`
/// - `keep_alive_interval`: period of the keep-alive probe while `Ready` (`0s` = off)
/// - `feed_capacity`: broadcast feed ring size (min 1)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Dependencies gating readiness. Observed only, never controlled.
    pub depends_on: Vec<Supervisor>,

    /// Cooldown before automatic recovery from `Failed`.
    pub restart_interval: Duration,

    /// Keep-alive period while `Ready`.
    ///
    /// - `Duration::ZERO` = disabled
    /// - `> 0` = the service's `keep_alive` hook runs once per period
    pub keep_alive_interval: Duration,

    /// Capacity of the transition feed returned by [`Supervisor::events`].
    ///
    /// Receivers lagging more than this many transitions get `Lagged`.
    pub feed_capacity: usize,
}

impl SupervisorConfig {
    /// Returns the keep-alive period as an `Option`.
    ///
    /// - `None` → disabled
    /// - `Some(d)` → probe every `d`
    #[inline]
    pub fn keep_alive(&self) -> Option<Duration> {
        if self.keep_alive_interval == Duration::ZERO {
            None
        } else {
            Some(self.keep_alive_interval)
        }
    }

    /// Returns a feed capacity clamped to a minimum of 1.
    #[inline]
    pub fn feed_capacity_clamped(&self) -> usize {
        self.feed_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - no dependencies
    /// - `restart_interval = 60s`
    /// - `keep_alive_interval = 0s` (disabled)
    /// - `feed_capacity = 1024`
    fn default() -> Self {
        Self {
            depends_on: Vec::new(),
            restart_interval: DEFAULT_RESTART_INTERVAL,
            keep_alive_interval: Duration::ZERO,
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}
