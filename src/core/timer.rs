//! # Restart and keep-alive timers.
//!
//! Both timers are a `sleep` raced against a [`CancellationToken`], spawned on the
//! runtime captured at construction and holding only a weak reference to the
//! supervisor.
//!
//! ```text
//! enter Failed ──► RestartTimer::arm() ──► spawn_restart(token, interval)
//!                                               ├─ sleep elapsed ─► Shared::restart_elapsed(token)
//!                                               └─ token cancelled (left Failed / dropped) ─► exit
//!
//! enter Ready  ──► spawn_keep_alive(token, period)
//!                      loop { sleep ─► keep_alive hook ─► Err ─► report_failure }
//!                      └─ token cancelled (left Ready / dropped) ─► exit
//! ```

use std::sync::Weak;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::core::Shared;
use crate::core::hooks::panic_message;
use crate::services::ServiceContext;

/// Single cancellable delayed restart, alive only while in `Failed`.
#[derive(Debug, Default)]
pub(crate) struct RestartTimer {
    token: Option<CancellationToken>,
    elapsed: bool,
}

impl RestartTimer {
    /// Cancels any previous arming and returns the token of a fresh one.
    pub(crate) fn arm(&mut self) -> CancellationToken {
        self.cancel();
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        token
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.elapsed = false;
    }

    /// Marks the timer as elapsed if `token` is still the armed one.
    pub(crate) fn fire(&mut self, token: &CancellationToken) -> bool {
        let current = matches!(&self.token, Some(t) if !t.is_cancelled() && !token.is_cancelled());
        if current {
            self.elapsed = true;
        }
        current
    }

    /// Consumes an elapsed timer.
    pub(crate) fn take_elapsed(&mut self) -> bool {
        if self.elapsed {
            self.elapsed = false;
            self.token = None;
            true
        } else {
            false
        }
    }
}

/// Sleeps for `delay` unless `token` is cancelled first. Returns `true` if the delay elapsed.
pub(crate) async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    tokio::select! {
        _ = &mut sleep => !token.is_cancelled(),
        _ = token.cancelled() => false,
    }
}

pub(crate) fn spawn_restart(
    runtime: &Handle,
    shared: Weak<Shared>,
    token: CancellationToken,
    delay: Duration,
) {
    runtime.spawn(async move {
        if !sleep_or_cancel(delay, &token).await {
            return;
        }
        if let Some(shared) = shared.upgrade() {
            shared.restart_elapsed(&token);
        }
    });
}

pub(crate) fn spawn_keep_alive(
    runtime: &Handle,
    shared: Weak<Shared>,
    token: CancellationToken,
    period: Duration,
) {
    runtime.spawn(async move {
        loop {
            if !sleep_or_cancel(period, &token).await {
                return;
            }
            let probe = {
                let Some(s) = shared.upgrade() else { return };
                let ctx = ServiceContext::new(s.name.clone(), shared.clone());
                s.service.keep_alive(ctx)
            };
            let Some(probe) = probe else { return };

            let res = match std::panic::AssertUnwindSafe(probe).catch_unwind().await {
                Ok(res) => res,
                Err(panic_err) => Err(anyhow::anyhow!(
                    "keep-alive probe panicked: {}",
                    panic_message(&*panic_err)
                )),
            };
            if token.is_cancelled() {
                return;
            }
            if let Err(err) = res {
                if let Some(s) = shared.upgrade() {
                    s.report_failure(err.context("keep-alive probe failed"));
                }
                return;
            }
        }
    });
}
