//! # Hook runner.
//!
//! Invokes at most one lifecycle hook per supervisor and reports its settlement back
//! to the state machine through [`Shared::settle`].
//!
//! ```text
//! evaluation pass ─► Step::Invoke { hook, id }
//!                       └─► invoke()
//!                             ├─ hook absent      ─► settle(id, Ok)        (no yield)
//!                             ├─ no runtime       ─► settle(id, Err)
//!                             └─ Some(fut) ─► runtime.spawn(run(fut)) ─► settle(id, result)
//! ```
//!
//! ## Rules
//! - A hook future is never cancelled and has no timeout; a hook that never settles
//!   keeps its supervisor in the active state.
//! - Panics (in the call or in the future) are converted into failures.
//! - Settlements carry the operation id; a settlement for anything but the current
//!   operation is ignored.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Weak;

use futures::FutureExt;

use crate::core::{Hook, Shared};
use crate::services::{HookFuture, ServiceContext, call_hook};

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Awaits one hook future, turning a panic into an error.
pub(crate) async fn run(hook: Hook, fut: HookFuture) -> anyhow::Result<()> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic_err) => Err(anyhow::anyhow!(
            "{hook} hook panicked: {}",
            panic_message(&*panic_err)
        )),
    }
}

/// Starts operation `id` for `hook`. Must be called without the core lock held.
pub(crate) fn invoke(shared: &Shared, me: Weak<Shared>, hook: Hook, id: u64) {
    let ctx = ServiceContext::new(shared.name.clone(), me.clone());
    let call = panic::catch_unwind(AssertUnwindSafe(|| call_hook(&*shared.service, hook, ctx)));

    let fut = match call {
        Ok(Some(fut)) => fut,
        Ok(None) => return shared.settle(id, Ok(())),
        Err(panic_err) => {
            let err = anyhow::anyhow!("{hook} hook panicked: {}", panic_message(&*panic_err));
            return shared.settle(id, Err(err));
        }
    };

    let Some(runtime) = shared.runtime.as_ref() else {
        let err = anyhow::anyhow!("no tokio runtime available to drive the {hook} hook");
        return shared.settle(id, Err(err));
    };

    tracing::trace!(service = %shared.name, hook = %hook, op = id, "hook spawned");
    runtime.spawn(async move {
        let res = run(hook, fut).await;
        if let Some(shared) = me.upgrade() {
            shared.settle(id, res);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicking_future_becomes_error() {
        let fut: HookFuture = Box::pin(async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        });
        let err = run(Hook::Start, fut).await.unwrap_err();
        assert_eq!(err.to_string(), "start hook panicked: kaboom");
    }

    #[tokio::test]
    async fn result_passes_through() {
        let ok: HookFuture = Box::pin(async { Ok(()) });
        assert!(run(Hook::Init, ok).await.is_ok());

        let failing: HookFuture = Box::pin(async { Err(anyhow::anyhow!("nope")) });
        assert_eq!(run(Hook::Stop, failing).await.unwrap_err().to_string(), "nope");
    }
}
