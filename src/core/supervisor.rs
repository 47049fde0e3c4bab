//! # Supervisor: drives one service through its lifecycle.
//!
//! The [`Supervisor`] owns the state of a single service, its control flags
//! (`stopped`, `dispose_requested`), the failure reason, the in-flight hook
//! operation, the restart timer, a [`ListenerSet`] and a [`Feed`].
//!
//! ## Evaluation pass
//! ```text
//! trigger (command / hook settled / dependency flipped / timer elapsed)
//!    └─► evaluate()
//!          ├─ another pass running? ─► return (it will observe the change)
//!          └─ loop {
//!               lock core ─► advance() ─┬─ None                 ─► unlock, exit
//!                                       ├─ Step::Notify(t)       ─► unlock, listeners + feed
//!                                       └─ Step::Invoke(hook,id) ─► unlock, hook runner
//!             }
//! ```
//!
//! ## Rules
//! - Exactly one pass runs at a time; triggers arriving meanwhile (from other threads
//!   or from listeners) only record their effect under the lock.
//! - The core lock is **never** held while user code runs (hooks, listeners).
//! - Passes chain through hook-less states iteratively and stop at a pending operation.
//! - Commands never cancel an in-flight hook; they only flip flags consulted once it settles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::core::builder::SupervisorBuilder;
use crate::core::deps::{self, DependencyTracker};
use crate::core::hooks;
use crate::core::timer::{self, RestartTimer};
use crate::core::{Hook, ServiceState, SupervisorConfig};
use crate::error::{ConfigError, Failure, NotReadyError};
use crate::events::{Feed, Transition};
use crate::listeners::{Listen, ListenerSet, Subscription};
use crate::services::ServiceRef;

/// Snapshot of a supervisor's state.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    /// Current state.
    pub state: ServiceState,
    /// Failure reason while `Stopping` toward `Failed` or in `Failed`;
    /// the `init` error while in `InitializeFailed`.
    pub failure: Option<Failure>,
}

/// The one hook invocation in flight.
#[derive(Debug)]
struct Operation {
    id: u64,
    hook: Hook,
    outcome: Option<anyhow::Result<()>>,
}

/// Mutable state, only touched under the core lock.
#[derive(Debug)]
struct Core {
    state: ServiceState,
    failure: Option<Failure>,
    init_error: Option<Failure>,
    stopped: bool,
    dispose_requested: bool,
    deps: DependencyTracker,
    operation: Option<Operation>,
    next_op: u64,
    restart: RestartTimer,
    keep_alive: Option<CancellationToken>,
    evaluating: bool,
}

/// Work produced by one evaluation step, performed with the lock released.
enum Step {
    Notify(Transition),
    Invoke { hook: Hook, id: u64 },
}

/// State shared by all handles of one supervisor.
pub(crate) struct Shared {
    pub(crate) name: Arc<str>,
    pub(crate) service: ServiceRef,
    pub(crate) listeners: ListenerSet,
    pub(crate) runtime: Option<Handle>,
    me: Weak<Shared>,
    dependencies: Vec<Supervisor>,
    restart_interval: Duration,
    keep_alive_interval: Option<Duration>,
    feed: Feed,
    core: Mutex<Core>,
}

/// Drives one [`Service`](crate::Service) through its lifecycle.
///
/// Cheap to clone; all clones refer to the same supervisor.
///
/// # Example
/// ```rust
/// use servicevisor::{ServiceFn, ServiceState, Supervisor, SupervisorConfig};
///
/// // No hooks: every state is instantly successful.
/// let sup = Supervisor::new("cache", ServiceFn::new().arc(), SupervisorConfig::default()).unwrap();
/// assert_eq!(sup.state(), ServiceState::Ready);
///
/// sup.stop();
/// assert_eq!(sup.state(), ServiceState::Stopped);
///
/// sup.dispose();
/// assert_eq!(sup.state(), ServiceState::Disposed);
/// ```
#[derive(Clone)]
pub struct Supervisor {
    pub(crate) shared: Arc<Shared>,
}

impl Supervisor {
    /// Creates a supervisor and runs its first evaluation pass.
    ///
    /// Hooks and timers run on the tokio runtime current at construction time.
    /// Without one, a present hook settles as a failure.
    pub fn new(
        name: impl Into<String>,
        service: ServiceRef,
        cfg: SupervisorConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_listeners(name.into(), service, cfg, Vec::new())
    }

    /// Like [`Supervisor::new`], registering `listeners` before the first pass so
    /// they observe the construction-time transitions too.
    pub(crate) fn with_listeners(
        name: String,
        service: ServiceRef,
        cfg: SupervisorConfig,
        listeners: Vec<Arc<dyn Listen>>,
    ) -> Result<Self, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }

        let total = cfg.depends_on.len();
        let feed = Feed::new(cfg.feed_capacity_clamped());
        let keep_alive_interval = cfg.keep_alive();
        let shared = Arc::new_cyclic(|me| Shared {
            name: Arc::from(name),
            service,
            listeners: ListenerSet::new(),
            runtime: Handle::try_current().ok(),
            me: me.clone(),
            dependencies: cfg.depends_on,
            restart_interval: cfg.restart_interval,
            keep_alive_interval,
            feed,
            core: Mutex::new(Core {
                state: ServiceState::NotInitialized,
                failure: None,
                init_error: None,
                stopped: false,
                dispose_requested: false,
                deps: DependencyTracker::new(total),
                operation: None,
                next_op: 0,
                restart: RestartTimer::default(),
                keep_alive: None,
                evaluating: false,
            }),
        });

        for listener in listeners {
            shared.listeners.add(listener);
        }
        shared.attach_dependencies();
        tracing::debug!(service = %shared.name, dependencies = total, "supervisor created");
        shared.evaluate();
        Ok(Self { shared })
    }

    /// Returns a builder with default configuration.
    pub fn builder(name: impl Into<String>, service: ServiceRef) -> SupervisorBuilder {
        SupervisorBuilder::new(name, service)
    }

    /// Name of the supervised service.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Names of the declared dependencies, in declaration order.
    pub fn dependencies(&self) -> Vec<&str> {
        self.shared.dependencies.iter().map(|d| d.name()).collect()
    }

    /// Clears the explicit-stop flag and lets the service come up.
    ///
    /// No-op once disposal was requested.
    pub fn start(&self) {
        self.shared.command("start", |core| core.stopped = false);
    }

    /// Sets the explicit-stop flag. A running service goes through `Stopping`.
    ///
    /// In `Failed` the flag is only recorded: the failure reason stays until the
    /// cooldown elapses, after which the service rests in `Stopped`.
    pub fn stop(&self) {
        self.shared.command("stop", |core| core.stopped = true);
    }

    /// Requests disposal. Sticky and irreversible; in-flight hooks are awaited first.
    pub fn dispose(&self) {
        let changed = {
            let mut core = self.shared.lock();
            let changed = !core.dispose_requested;
            core.dispose_requested = true;
            changed
        };
        if changed {
            tracing::debug!(service = %self.shared.name, "dispose requested");
            self.shared.evaluate();
        }
    }

    /// Reports a fault detected by the service body.
    ///
    /// While `Ready` this drives `Stopping` → `Failed`. While `Starting` or `Stopping`
    /// it fixes the destination to `Failed`; in `Failed` it replaces the reason.
    /// In every other state it is logged and dropped.
    pub fn report_failure(&self, err: impl Into<anyhow::Error>) {
        self.shared.report_failure(err.into());
    }

    /// Current state.
    pub fn state(&self) -> ServiceState {
        self.shared.lock().state
    }

    /// Current state plus failure reason.
    pub fn status(&self) -> ServiceStatus {
        let core = self.shared.lock();
        let failure = match core.state {
            ServiceState::InitializeFailed => core.init_error.clone(),
            _ => core.failure.clone(),
        };
        ServiceStatus {
            state: core.state,
            failure,
        }
    }

    /// Returns `true` once `stop()` was called and not undone by `start()`.
    pub fn is_stop_requested(&self) -> bool {
        self.shared.lock().stopped
    }

    /// Returns `true` once `dispose()` was called.
    pub fn is_dispose_requested(&self) -> bool {
        self.shared.lock().dispose_requested
    }

    /// Registers a listener called synchronously on every committed transition.
    pub fn subscribe(&self, listener: impl Listen) -> Subscription {
        self.shared.listeners.add(Arc::new(listener))
    }

    /// Returns a receiver of all transitions committed from now on.
    pub fn events(&self) -> broadcast::Receiver<Transition> {
        self.shared.feed.subscribe()
    }

    /// Waits until the service enters `target` (or is already in it).
    ///
    /// Returns early with the state reached instead if the service ends up in
    /// `InitializeFailed` or `Disposed` first.
    pub async fn wait_for(&self, target: ServiceState) -> ServiceState {
        let mut rx = self.events();
        let current = self.state();
        if current == target || current.is_dead_end() {
            return current;
        }
        loop {
            match rx.recv().await {
                Ok(t) if t.to == target || t.to.is_dead_end() => return t.to,
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {
                    let current = self.state();
                    if current == target || current.is_dead_end() {
                        return current;
                    }
                }
                Err(RecvError::Closed) => return self.state(),
            }
        }
    }

    /// Fails with [`NotReadyError`] unless the service is `Ready`.
    pub fn ensure_ready(&self) -> Result<(), NotReadyError> {
        let status = self.status();
        if status.state == ServiceState::Ready {
            Ok(())
        } else {
            Err(NotReadyError {
                service: self.shared.name.clone(),
                state: status.state,
                failure: status.failure,
            })
        }
    }

    /// Runs `f` only if the service is `Ready`.
    ///
    /// ```rust
    /// use servicevisor::{ServiceFn, Supervisor};
    ///
    /// let sup = Supervisor::builder("db", ServiceFn::new().arc()).build().unwrap();
    /// assert_eq!(sup.guard(|| 42).unwrap(), 42);
    ///
    /// sup.stop();
    /// assert!(sup.guard(|| 42).is_err());
    /// ```
    pub fn guard<T>(&self, f: impl FnOnce() -> T) -> Result<T, NotReadyError> {
        self.ensure_ready()?;
        Ok(f())
    }

    /// Returns `true` if both handles refer to the same supervisor.
    pub fn ptr_eq(&self, other: &Supervisor) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to every dependency and seeds the readiness flags.
    fn attach_dependencies(&self) {
        let subscriptions = deps::observe(&self.dependencies, &self.me);
        let mut core = self.lock();
        for (index, dep) in self.dependencies.iter().enumerate() {
            core.deps.set(index, dep.state() == ServiceState::Ready);
        }
        core.deps.attach(subscriptions);
    }

    /// Applies a flag change unless disposal is under way, then evaluates.
    fn command(&self, name: &'static str, apply: impl FnOnce(&mut Core)) {
        {
            let mut core = self.lock();
            if core.dispose_requested || core.state.is_disposing() {
                tracing::trace!(service = %self.name, command = name, "ignored after dispose");
                return;
            }
            apply(&mut core);
        }
        self.evaluate();
    }

    pub(crate) fn report_failure(&self, err: anyhow::Error) {
        {
            let mut core = self.lock();
            match core.state {
                ServiceState::Ready
                | ServiceState::Starting
                | ServiceState::Stopping
                | ServiceState::Failed => {
                    tracing::warn!(
                        service = %self.name,
                        state = %core.state,
                        error = %err,
                        "failure reported"
                    );
                    core.failure = Some(Arc::new(err));
                }
                state => {
                    tracing::debug!(
                        service = %self.name,
                        state = %state,
                        error = %err,
                        "failure report dropped"
                    );
                    return;
                }
            }
        }
        self.evaluate();
    }

    pub(crate) fn dependency_changed(&self, index: usize, ready: bool) {
        let flipped = {
            let mut core = self.lock();
            let flipped = core.deps.set(index, ready);
            tracing::trace!(
                service = %self.name,
                dependency = index,
                ready,
                ready_count = core.deps.ready_count(),
                "dependency readiness changed"
            );
            flipped
        };
        if flipped {
            self.evaluate();
        }
    }

    /// Records the outcome of operation `id` and evaluates.
    pub(crate) fn settle(&self, id: u64, outcome: anyhow::Result<()>) {
        {
            let mut core = self.lock();
            match core.operation.as_mut() {
                Some(op) if op.id == id && op.outcome.is_none() => op.outcome = Some(outcome),
                _ => return,
            }
        }
        self.evaluate();
    }

    pub(crate) fn restart_elapsed(&self, token: &CancellationToken) {
        let fired = {
            let mut core = self.lock();
            core.state == ServiceState::Failed && core.restart.fire(token)
        };
        if fired {
            tracing::info!(service = %self.name, "restart cooldown elapsed");
            self.evaluate();
        }
    }

    /// Runs evaluation steps until the machine yields.
    pub(crate) fn evaluate(&self) {
        {
            let mut core = self.lock();
            if core.evaluating {
                return;
            }
            core.evaluating = true;
        }

        loop {
            let step = {
                let mut core = self.lock();
                match self.advance(&mut core) {
                    Some(step) => step,
                    None => {
                        core.evaluating = false;
                        return;
                    }
                }
            };

            match step {
                Step::Notify(t) => {
                    self.listeners.notify(&t);
                    self.feed.publish(t);
                }
                Step::Invoke { hook, id } => hooks::invoke(self, self.me.clone(), hook, id),
            }
        }
    }

    /// Computes and commits at most one transition, or starts the pending hook.
    fn advance(&self, core: &mut Core) -> Option<Step> {
        use ServiceState::*;

        let all_ready = core.deps.all_ready();
        let next = match core.state {
            NotInitialized => {
                if all_ready && !core.dispose_requested {
                    Initializing
                } else {
                    WaitingDependencies
                }
            }
            WaitingDependencies => {
                if core.dispose_requested {
                    Disposing
                } else if all_ready {
                    Initializing
                } else {
                    return None;
                }
            }
            InitializeFailed => {
                if !core.dispose_requested {
                    return None;
                }
                Disposing
            }
            Stopped => {
                if core.dispose_requested {
                    Disposing
                } else if !core.stopped && all_ready && core.failure.is_none() {
                    Starting
                } else {
                    return None;
                }
            }
            Ready => {
                if all_ready && !core.stopped && !core.dispose_requested && core.failure.is_none() {
                    return None;
                }
                Stopping
            }
            Failed => {
                if core.dispose_requested {
                    Disposing
                } else if core.restart.take_elapsed() {
                    core.failure = None;
                    Stopped
                } else {
                    return None;
                }
            }
            Disposed => return None,
            Initializing | Starting | Stopping | Disposing => {
                let active = core.state.hook()?;
                match core.operation.take() {
                    None => {
                        let id = core.next_op;
                        core.next_op += 1;
                        core.operation = Some(Operation {
                            id,
                            hook: active,
                            outcome: None,
                        });
                        return Some(Step::Invoke { hook: active, id });
                    }
                    Some(Operation {
                        hook,
                        outcome: Some(outcome),
                        ..
                    }) => self.settled(core, hook, outcome),
                    Some(pending) => {
                        core.operation = Some(pending);
                        return None;
                    }
                }
            }
        };

        Some(Step::Notify(self.commit(core, next)))
    }

    /// Destination of an active state once its hook settled.
    fn settled(&self, core: &mut Core, hook: Hook, outcome: anyhow::Result<()>) -> ServiceState {
        use ServiceState::*;

        match (hook, outcome) {
            (Hook::Init, Ok(())) => Stopped,
            (Hook::Init, Err(err)) => {
                tracing::error!(service = %self.name, error = %err, "init hook failed");
                core.init_error = Some(Arc::new(err));
                InitializeFailed
            }
            (Hook::Start, Ok(())) => {
                let proceed = core.deps.all_ready()
                    && !core.stopped
                    && !core.dispose_requested
                    && core.failure.is_none();
                if proceed { Ready } else { Stopping }
            }
            (Hook::Start, Err(err)) => {
                tracing::warn!(service = %self.name, error = %err, "start hook failed");
                core.failure = Some(Arc::new(err));
                Stopping
            }
            (Hook::Stop, outcome) => {
                if let Err(err) = outcome {
                    tracing::warn!(service = %self.name, error = %err, "stop hook failed");
                }
                if core.failure.is_some() { Failed } else { Stopped }
            }
            (Hook::Dispose, outcome) => {
                if let Err(err) = outcome {
                    tracing::warn!(service = %self.name, error = %err, "dispose hook failed");
                }
                Disposed
            }
        }
    }

    /// Moves to `to`, handling timers and dependency subscriptions tied to the edge.
    fn commit(&self, core: &mut Core, to: ServiceState) -> Transition {
        let from = core.state;
        debug_assert!(from.can_transition_to(to), "illegal transition {from} -> {to}");

        match from {
            ServiceState::Failed => {
                core.restart.cancel();
                core.failure = None;
            }
            ServiceState::Ready => {
                if let Some(token) = core.keep_alive.take() {
                    token.cancel();
                }
            }
            ServiceState::InitializeFailed => core.init_error = None,
            _ => {}
        }

        core.state = to;
        match to {
            ServiceState::Failed => self.arm_restart(core),
            ServiceState::Ready => self.arm_keep_alive(core),
            ServiceState::Disposed => core.deps.detach(),
            _ => {}
        }

        let failure = match to {
            ServiceState::InitializeFailed => core.init_error.clone(),
            ServiceState::Stopping | ServiceState::Failed => core.failure.clone(),
            _ => None,
        };
        tracing::debug!(service = %self.name, from = %from, to = %to, "transition");
        Transition::new(self.name.clone(), from, to).with_failure(failure)
    }

    fn arm_restart(&self, core: &mut Core) {
        let token = core.restart.arm();
        let Some(runtime) = self.runtime.as_ref() else {
            tracing::warn!(
                service = %self.name,
                "no tokio runtime; failed service will not restart"
            );
            return;
        };
        tracing::info!(
            service = %self.name,
            delay_ms = self.restart_interval.as_millis() as u64,
            "restart scheduled"
        );
        timer::spawn_restart(runtime, self.me.clone(), token, self.restart_interval);
    }

    fn arm_keep_alive(&self, core: &mut Core) {
        let (Some(period), Some(runtime)) = (self.keep_alive_interval, self.runtime.as_ref()) else {
            return;
        };
        let token = CancellationToken::new();
        core.keep_alive = Some(token.clone());
        timer::spawn_keep_alive(runtime, self.me.clone(), token, period);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        core.restart.cancel();
        if let Some(token) = core.keep_alive.take() {
            token.cancel();
        }
        core.deps.detach();
    }
}
