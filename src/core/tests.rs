use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use tokio::time::{Instant, sleep};

use crate::core::{ServiceState, Supervisor, SupervisorConfig};
use crate::events::Transition;
use crate::listeners::Listen;
use crate::services::{ServiceFn, ServiceRef};

use ServiceState::*;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Records every committed transition with the (virtual) time it was observed.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<(Transition, Instant)>>>);

impl Listen for Recorder {
    fn on_transition(&self, t: &Transition) {
        self.0.lock().unwrap().push((t.clone(), Instant::now()));
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

impl Recorder {
    fn states(&self) -> Vec<ServiceState> {
        self.0.lock().unwrap().iter().map(|(t, _)| t.to).collect()
    }

    fn transitions(&self) -> Vec<Transition> {
        self.0.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    fn entered_at(&self, state: ServiceState) -> Vec<Instant> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t.to == state)
            .map(|(_, at)| *at)
            .collect()
    }

    fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Service whose four hooks each take `delay` to succeed.
fn slow(delay: Duration) -> ServiceFn {
    ServiceFn::new()
        .on_init(move |_| async move {
            sleep(delay).await;
            Ok(())
        })
        .on_start(move |_| async move {
            sleep(delay).await;
            Ok(())
        })
        .on_stop(move |_| async move {
            sleep(delay).await;
            Ok(())
        })
        .on_dispose(move |_| async move {
            sleep(delay).await;
            Ok(())
        })
}

fn supervise(name: &str, service: ServiceRef, cfg: SupervisorConfig) -> (Supervisor, Recorder) {
    let rec = Recorder::default();
    let sup = Supervisor::builder(name, service)
        .with_config(cfg)
        .with_listener(rec.clone())
        .build()
        .unwrap();
    (sup, rec)
}

fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + ms(1),
        "expected ~{expected:?}, got {actual:?}"
    );
}

fn plain(name: &str) -> Supervisor {
    Supervisor::new(name, ServiceFn::new().arc(), SupervisorConfig::default()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn timed_hooks_reach_ready_and_stay_there() {
    let t0 = Instant::now();
    let (sup, rec) = supervise("svc", slow(ms(100)).arc(), SupervisorConfig::default());
    assert_eq!(sup.state(), Initializing);

    sleep(ms(150)).await;
    assert_eq!(sup.state(), Starting);
    sleep(ms(100)).await;
    assert_eq!(sup.state(), Ready);

    assert_eq!(rec.states(), [Initializing, Stopped, Starting, Ready]);
    assert_near(rec.entered_at(Stopped)[0] - t0, ms(100));
    assert_near(rec.entered_at(Ready)[0] - t0, ms(200));

    sleep(Duration::from_secs(600)).await;
    assert_eq!(sup.state(), Ready);
    assert_eq!(rec.states().len(), 4);
}

#[test]
fn hookless_service_moves_synchronously() {
    let (sup, rec) = supervise("svc", ServiceFn::new().arc(), SupervisorConfig::default());
    assert_eq!(sup.state(), Ready);
    assert!(!rec.states().contains(&WaitingDependencies));

    sup.stop();
    assert_eq!(sup.state(), Stopped);
    sup.start();
    assert_eq!(sup.state(), Ready);
    sup.dispose();
    assert_eq!(sup.state(), Disposed);

    assert_eq!(
        rec.states(),
        [
            Initializing, Stopped, Starting, Ready, Stopping, Stopped, Starting, Ready, Stopping,
            Stopped, Disposing, Disposed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn dependent_waits_then_initializes_immediately() {
    let a = Supervisor::new("a", slow(ms(100)).arc(), SupervisorConfig::default()).unwrap();
    let (b, rec) = supervise(
        "b",
        slow(ms(100)).arc(),
        SupervisorConfig {
            depends_on: vec![a.clone()],
            ..SupervisorConfig::default()
        },
    );
    assert_eq!(b.state(), WaitingDependencies);

    assert_eq!(a.wait_for(Ready).await, Ready);
    assert_eq!(b.state(), Initializing);
    assert_eq!(rec.states(), [WaitingDependencies, Initializing]);

    assert_eq!(b.wait_for(Ready).await, Ready);
}

#[tokio::test(start_paused = true)]
async fn reported_failure_stops_fails_and_restarts() {
    let cfg = SupervisorConfig {
        restart_interval: Duration::from_secs(1),
        ..SupervisorConfig::default()
    };
    let (sup, rec) = supervise("svc", slow(ms(100)).arc(), cfg);
    sup.wait_for(Ready).await;
    rec.clear();

    sup.report_failure(anyhow::anyhow!("conn lost"));
    assert_eq!(sup.state(), Stopping);
    assert_eq!(sup.status().failure.unwrap().to_string(), "conn lost");

    assert_eq!(sup.wait_for(Failed).await, Failed);
    let status = sup.status();
    assert_eq!(status.state, Failed);
    assert_eq!(status.failure.unwrap().to_string(), "conn lost");

    assert_eq!(sup.wait_for(Ready).await, Ready);
    assert!(sup.status().failure.is_none());
    assert_eq!(rec.states(), [Stopping, Failed, Stopped, Starting, Ready]);

    let failed = rec.entered_at(Failed)[0];
    let stopped = rec.entered_at(Stopped)[0];
    assert!(stopped - failed >= Duration::from_secs(1));

    let failures: Vec<_> = rec.transitions().iter().map(|t| t.failure.is_some()).collect();
    assert_eq!(failures, [true, true, false, false, false]);
}

#[tokio::test(start_paused = true)]
async fn dispose_waits_for_in_flight_start() {
    let (sup, rec) = supervise("svc", slow(ms(100)).arc(), SupervisorConfig::default());
    sleep(ms(150)).await;
    assert_eq!(sup.state(), Starting);

    sup.dispose();
    assert_eq!(sup.state(), Starting, "in-flight start is never aborted");

    assert_eq!(sup.wait_for(Disposed).await, Disposed);
    assert_eq!(
        rec.states(),
        [Initializing, Stopped, Starting, Stopping, Stopped, Disposing, Disposed]
    );
}

#[test]
fn waits_for_every_dependency_and_drops_out_with_any() {
    let deps: Vec<Supervisor> = (0..3).map(|i| plain(&format!("dep-{i}"))).collect();
    deps.iter().for_each(Supervisor::stop);

    let (sup, rec) = supervise(
        "svc",
        ServiceFn::new().arc(),
        SupervisorConfig {
            depends_on: deps.clone(),
            ..SupervisorConfig::default()
        },
    );
    assert_eq!(sup.state(), WaitingDependencies);

    deps[0].start();
    deps[2].start();
    assert_eq!(sup.state(), WaitingDependencies);
    deps[1].start();
    assert_eq!(sup.state(), Ready);

    rec.clear();
    deps[1].stop();
    assert_eq!(sup.state(), Stopped);
    assert_eq!(rec.states(), [Stopping, Stopped]);
    assert!(sup.status().failure.is_none());

    deps[1].start();
    assert_eq!(sup.state(), Ready);
}

#[tokio::test(start_paused = true)]
async fn dependency_lost_during_start_routes_to_stopping() {
    let dep = plain("dep");
    let (sup, rec) = supervise(
        "svc",
        ServiceFn::new()
            .on_start(|_| async {
                sleep(ms(100)).await;
                Ok(())
            })
            .arc(),
        SupervisorConfig {
            depends_on: vec![dep.clone()],
            ..SupervisorConfig::default()
        },
    );
    assert_eq!(sup.state(), Starting);

    dep.stop();
    sleep(ms(150)).await;
    assert_eq!(sup.state(), Stopped);
    assert_eq!(rec.states(), [Initializing, Stopped, Starting, Stopping, Stopped]);

    dep.start();
    assert_eq!(sup.state(), Starting);
    assert_eq!(sup.wait_for(Ready).await, Ready);
}

#[tokio::test(start_paused = true)]
async fn dispose_is_sticky() {
    let (sup, rec) = supervise("svc", slow(ms(10)).arc(), SupervisorConfig::default());
    sup.dispose();
    sup.start();
    sup.stop();
    sup.start();
    sup.dispose();
    assert!(sup.is_dispose_requested());

    assert_eq!(sup.wait_for(Disposed).await, Disposed);
    sup.start();
    sleep(ms(100)).await;
    assert_eq!(sup.state(), Disposed);
    assert_eq!(rec.states().last(), Some(&Disposed));
    assert_eq!(rec.states().iter().filter(|s| **s == Disposed).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn start_failure_goes_through_stopping_into_failed() {
    let stops = Arc::new(Mutex::new(0));
    let counter = stops.clone();
    let svc = ServiceFn::new()
        .on_start(|_| async { Err(anyhow::anyhow!("port in use")) })
        .on_stop(move |_| {
            *counter.lock().unwrap() += 1;
            async { Ok(()) }
        })
        .arc();
    let (sup, rec) = supervise("svc", svc, SupervisorConfig::default());

    assert_eq!(sup.wait_for(Failed).await, Failed);
    assert_eq!(*stops.lock().unwrap(), 1, "stop hook releases resources");
    assert_eq!(rec.states(), [Initializing, Stopped, Starting, Stopping, Failed]);
    assert_eq!(sup.status().failure.unwrap().to_string(), "port in use");
}

#[tokio::test(start_paused = true)]
async fn rejecting_stop_hook_keeps_the_same_path_as_report_failure() {
    let reported = {
        let (sup, rec) = supervise("a", ServiceFn::new().arc(), SupervisorConfig::default());
        rec.clear();
        sup.report_failure(anyhow::anyhow!("boom"));
        rec.states()
    };

    let rejected = {
        let svc = ServiceFn::new()
            .on_stop(|_| async { Err(anyhow::anyhow!("stop failed too")) })
            .arc();
        let (sup, rec) = supervise("b", svc, SupervisorConfig::default());
        rec.clear();
        sup.report_failure(anyhow::anyhow!("boom"));
        sup.wait_for(Failed).await;
        assert_eq!(sup.status().failure.unwrap().to_string(), "boom");
        rec.states()
    };

    assert_eq!(reported, [Stopping, Failed]);
    assert_eq!(reported, rejected);
}

#[tokio::test(start_paused = true)]
async fn stop_during_failed_rests_in_stopped_after_cooldown() {
    let cfg = SupervisorConfig {
        restart_interval: Duration::from_secs(5),
        ..SupervisorConfig::default()
    };
    let (sup, rec) = supervise("svc", ServiceFn::new().arc(), cfg);
    sup.report_failure(anyhow::anyhow!("boom"));
    assert_eq!(sup.state(), Failed);

    sup.stop();
    assert_eq!(sup.state(), Failed);
    assert!(sup.status().failure.is_some(), "reason kept until the cooldown");

    sleep(Duration::from_secs(6)).await;
    assert_eq!(sup.state(), Stopped);
    assert!(sup.status().failure.is_none());
    assert_eq!(rec.states().last(), Some(&Stopped));

    sup.start();
    assert_eq!(sup.state(), Ready);
}

#[tokio::test(start_paused = true)]
async fn start_after_stop_during_failed_restarts_normally() {
    let cfg = SupervisorConfig {
        restart_interval: Duration::from_secs(5),
        ..SupervisorConfig::default()
    };
    let (sup, _rec) = supervise("svc", ServiceFn::new().arc(), cfg);
    sup.report_failure(anyhow::anyhow!("boom"));
    sup.stop();
    sup.start();
    assert_eq!(sup.state(), Failed);

    sleep(Duration::from_secs(4)).await;
    assert_eq!(sup.state(), Failed, "never before the cooldown");
    sleep(Duration::from_secs(2)).await;
    assert_eq!(sup.state(), Ready);
}

#[tokio::test(start_paused = true)]
async fn dispose_during_failed_cancels_the_restart() {
    let cfg = SupervisorConfig {
        restart_interval: Duration::from_secs(5),
        ..SupervisorConfig::default()
    };
    let (sup, rec) = supervise("svc", ServiceFn::new().arc(), cfg);
    sup.report_failure(anyhow::anyhow!("boom"));
    sup.dispose();
    assert_eq!(sup.state(), Disposed);
    assert!(sup.status().failure.is_none());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(rec.states().last(), Some(&Disposed));
}

#[tokio::test(start_paused = true)]
async fn initialize_failed_is_never_retried() {
    let attempts = Arc::new(Mutex::new(0));
    let counter = attempts.clone();
    let svc = ServiceFn::new()
        .on_init(move |_| {
            *counter.lock().unwrap() += 1;
            async { Err(anyhow::anyhow!("bad config")) }
        })
        .arc();
    let cfg = SupervisorConfig {
        restart_interval: ms(10),
        ..SupervisorConfig::default()
    };
    let (sup, rec) = supervise("svc", svc, cfg);

    assert_eq!(sup.wait_for(Ready).await, InitializeFailed);
    sup.start();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(sup.state(), InitializeFailed);
    assert_eq!(*attempts.lock().unwrap(), 1);
    assert_eq!(sup.status().failure.unwrap().to_string(), "bad config");
    let last = rec.transitions().pop().unwrap();
    assert_eq!(last.to, InitializeFailed);
    assert!(last.failure.is_some());

    sup.dispose();
    assert_eq!(sup.state(), Disposed);
}

#[tokio::test(start_paused = true)]
async fn report_failure_outside_running_states_is_dropped() {
    let (sup, rec) = supervise("svc", ServiceFn::new().arc(), SupervisorConfig::default());
    sup.stop();
    rec.clear();

    sup.report_failure(anyhow::anyhow!("late"));
    assert_eq!(sup.state(), Stopped);
    assert!(sup.status().failure.is_none());
    assert!(rec.states().is_empty());

    sup.start();
    assert_eq!(sup.state(), Ready);
}

#[tokio::test(start_paused = true)]
async fn context_reports_failures_from_the_service_body() {
    let slot: Arc<Mutex<Option<crate::services::ServiceContext>>> = Arc::default();
    let keep = slot.clone();
    let svc = ServiceFn::new()
        .on_start(move |ctx| {
            *keep.lock().unwrap() = Some(ctx);
            async { Ok(()) }
        })
        .arc();
    let (sup, _rec) = supervise("svc", svc, SupervisorConfig::default());
    assert_eq!(sup.wait_for(Ready).await, Ready);

    let ctx = slot.lock().unwrap().take().unwrap();
    assert_eq!(ctx.name(), "svc");
    ctx.report_failure(anyhow::anyhow!("socket closed"));
    assert_eq!(sup.state(), Failed);

    drop(sup);
    assert!(!ctx.is_attached());
    ctx.report_failure(anyhow::anyhow!("ignored"));
}

#[tokio::test(start_paused = true)]
async fn keep_alive_failure_is_reported() {
    let probes = Arc::new(Mutex::new(0u32));
    let counter = probes.clone();
    let svc = ServiceFn::new()
        .on_keep_alive(move |_| {
            let n = {
                let mut n = counter.lock().unwrap();
                *n += 1;
                *n
            };
            async move {
                if n < 3 {
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("ping timeout"))
                }
            }
        })
        .arc();
    let cfg = SupervisorConfig {
        keep_alive_interval: Duration::from_secs(1),
        restart_interval: Duration::from_secs(30),
        ..SupervisorConfig::default()
    };
    let (sup, _rec) = supervise("svc", svc, cfg);

    sleep(ms(2500)).await;
    assert_eq!(sup.state(), Ready);
    assert_eq!(*probes.lock().unwrap(), 2);

    sleep(Duration::from_secs(1)).await;
    let status = sup.status();
    assert_eq!(status.state, Failed);
    assert_eq!(status.failure.unwrap().to_string(), "keep-alive probe failed");
    assert_eq!(*probes.lock().unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn keep_alive_stops_when_leaving_ready() {
    let probes = Arc::new(Mutex::new(0u32));
    let counter = probes.clone();
    let svc = ServiceFn::new()
        .on_keep_alive(move |_| {
            *counter.lock().unwrap() += 1;
            async { Ok(()) }
        })
        .arc();
    let cfg = SupervisorConfig {
        keep_alive_interval: Duration::from_secs(1),
        ..SupervisorConfig::default()
    };
    let (sup, _rec) = supervise("svc", svc, cfg);

    sleep(ms(1500)).await;
    sup.stop();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(*probes.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn panicking_hook_counts_as_failure() {
    let svc = ServiceFn::new()
        .on_start(|_| async {
            if true {
                panic!("start exploded");
            }
            Ok(())
        })
        .arc();
    let (sup, _rec) = supervise("svc", svc, SupervisorConfig::default());
    assert_eq!(sup.wait_for(Failed).await, Failed);
    assert_eq!(
        sup.status().failure.unwrap().to_string(),
        "start hook panicked: start exploded"
    );
}

#[test]
fn hook_without_runtime_settles_as_failure() {
    let svc = ServiceFn::new().on_init(|_| async { Ok(()) }).arc();
    let sup = Supervisor::new("svc", svc, SupervisorConfig::default()).unwrap();
    assert_eq!(sup.state(), InitializeFailed);
    assert!(sup.status().failure.is_some());
}

#[test]
fn listener_added_mid_round_sees_only_later_transitions() {
    let sup = plain("svc");
    let late = Recorder::default();

    let added = Arc::new(Mutex::new(false));
    let (handle, late2, added2) = (sup.clone(), late.clone(), added.clone());
    let _sub = sup.subscribe(move |t: &Transition| {
        let mut added = added2.lock().unwrap();
        if t.to == Stopping && !*added {
            *added = true;
            handle.subscribe(late2.clone());
        }
    });

    sup.stop();
    assert_eq!(late.states(), [Stopped]);
}

#[test]
fn panicking_listener_does_not_starve_the_rest() {
    let sup = plain("svc");
    let _boom = sup.subscribe(|_: &Transition| {
        panic!("listener bug");
    });
    let rec = Recorder::default();
    let sub = sup.subscribe(rec.clone());

    sup.stop();
    assert_eq!(rec.states(), [Stopping, Stopped]);
    assert_eq!(sup.state(), Stopped);

    sub.unsubscribe();
    sub.unsubscribe();
    sup.start();
    assert_eq!(rec.states().len(), 2);
}

#[test]
fn listener_may_issue_commands() {
    let sup = plain("svc");
    let handle = sup.clone();
    let _sub = sup.subscribe(move |t: &Transition| {
        if t.to == Stopped {
            handle.dispose();
        }
    });
    sup.stop();
    assert_eq!(sup.state(), Disposed);
}

#[tokio::test(start_paused = true)]
async fn feed_delivers_transitions_in_order() {
    let (sup, _rec) = supervise("svc", ServiceFn::new().arc(), SupervisorConfig::default());
    let mut rx = sup.events();
    sup.stop();
    sup.start();

    let mut seen = Vec::new();
    let mut last_seq = 0;
    for _ in 0..4 {
        let t = rx.recv().await.unwrap();
        assert!(t.seq > last_seq);
        last_seq = t.seq;
        seen.push(t.to);
    }
    assert_eq!(seen, [Stopping, Stopped, Starting, Ready]);
}

#[test]
fn guard_reports_state() {
    let sup = plain("db");
    assert!(sup.ensure_ready().is_ok());
    assert_eq!(sup.guard(|| "query").unwrap(), "query");

    sup.stop();
    let err = sup.guard(|| "query").unwrap_err();
    assert_eq!(err.state, Stopped);
    assert_eq!(&*err.service, "db");
    assert!(!err.is_transient());
}

#[test]
fn empty_name_is_rejected() {
    let err =
        Supervisor::new("  ", ServiceFn::new().arc(), SupervisorConfig::default()).unwrap_err();
    assert_eq!(err.as_label(), "config_empty_name");
}

#[test]
fn dropping_dependent_unsubscribes_from_dependency() {
    let dep = plain("dep");
    let before = dep.shared.listeners.len();
    let sup = Supervisor::builder("svc", ServiceFn::new().arc())
        .depends_on(&dep)
        .build()
        .unwrap();
    assert_eq!(dep.shared.listeners.len(), before + 1);
    drop(sup);
    assert_eq!(dep.shared.listeners.len(), before);
}

#[derive(Debug, Clone)]
enum Op {
    Start,
    Stop,
    Dispose,
    Fail,
    DepStop,
    DepStart,
    Advance(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Start),
        3 => Just(Op::Stop),
        1 => Just(Op::Dispose),
        2 => Just(Op::Fail),
        1 => Just(Op::DepStop),
        1 => Just(Op::DepStart),
        4 => (1u64..300).prop_map(Op::Advance),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transitions_form_a_valid_walk(
        ops in prop::collection::vec(op(), 1..40),
        delay in 0u64..80,
        failing_start in any::<bool>(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let (pairs, last) = rt.block_on(async move {
            let dep = Supervisor::new("dep", slow(ms(delay / 2)).arc(), SupervisorConfig::default())
                .unwrap();
            let svc = if failing_start {
                slow(ms(delay)).on_start(move |_| async move {
                    sleep(ms(delay)).await;
                    Err(anyhow::anyhow!("flaky"))
                })
            } else {
                slow(ms(delay))
            };
            let cfg = SupervisorConfig {
                depends_on: vec![dep.clone()],
                restart_interval: ms(200),
                ..SupervisorConfig::default()
            };
            let (sup, rec) = supervise("svc", svc.arc(), cfg);

            for op in ops {
                match op {
                    Op::Start => sup.start(),
                    Op::Stop => sup.stop(),
                    Op::Dispose => sup.dispose(),
                    Op::Fail => sup.report_failure(anyhow::anyhow!("injected")),
                    Op::DepStop => dep.stop(),
                    Op::DepStart => dep.start(),
                    Op::Advance(n) => sleep(ms(n)).await,
                }
            }
            sup.dispose();
            sleep(Duration::from_secs(5)).await;

            let pairs: Vec<_> = rec
                .transitions()
                .iter()
                .map(|t| (t.from, t.to, t.failure.is_some()))
                .collect();
            (pairs, sup.state())
        });

        prop_assert_eq!(last, Disposed);
        let mut prev = NotInitialized;
        for (from, to, has_failure) in pairs {
            prop_assert_eq!(from, prev);
            prop_assert!(from.can_transition_to(to), "illegal edge {} -> {}", from, to);
            if to == Failed {
                prop_assert!(has_failure);
            }
            prev = to;
        }
        prop_assert_eq!(prev, Disposed);
    }
}
