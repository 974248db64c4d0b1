//! End-to-end shutdown supervision with real threads and the tokio clock

use scripthost_core::application::worker::constants::WORKER_STOP_CHECK_INTERVAL;
use scripthost_core::application::{spawn_worker, ShutdownSupervisor, WorkerExit};
use scripthost_core::domain::{Phase, StopDecision, StopTimeout};
use scripthost_core::port::host_notifier::mocks::RecordingNotifier;
use scripthost_core::SupervisorConfig;
use scripthost_infra_system::{TokioClock, TracingNotifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn config() -> SupervisorConfig {
    SupervisorConfig {
        poll_interval_ms: 10,
        default_stop_wait_ms: 2000,
    }
}

fn setup() -> (ShutdownSupervisor, Arc<TokioClock>, Arc<RecordingNotifier>) {
    let clock = Arc::new(TokioClock::try_current().unwrap());
    let notifier = Arc::new(RecordingNotifier::new());
    let supervisor =
        ShutdownSupervisor::new("pyext", config(), clock.clone(), notifier.clone()).unwrap();
    (supervisor, clock, notifier)
}

async fn wait_until_idle(supervisor: &ShutdownSupervisor, limit: Duration) {
    tokio::time::timeout(limit, async {
        while supervisor.is_stopping() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("supervisor did not return to idle in time");
}

/// A script that ignores the stop flag until `release` is set
fn stubborn_script(
    supervisor: &ShutdownSupervisor,
    release: &Arc<AtomicBool>,
) -> std::thread::JoinHandle<WorkerExit> {
    let release = Arc::clone(release);
    spawn_worker(supervisor, "stubborn", move |_token| {
        while !release.load(Ordering::SeqCst) {
            std::thread::sleep(WORKER_STOP_CHECK_INTERVAL);
        }
    })
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cooperative_workers_drain() {
    let (supervisor, clock, notifier) = setup();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            spawn_worker(&supervisor, format!("script-{}", i), |token| {
                while !token.should_exit() {
                    std::thread::sleep(WORKER_STOP_CHECK_INTERVAL);
                }
            })
            .unwrap()
        })
        .collect();
    assert_eq!(supervisor.active_workers(), 4);

    let outcome = supervisor.request_stop(StopTimeout::Millis(1000));
    assert_eq!(
        outcome.decision,
        StopDecision::Started { needs_timer: true }
    );

    wait_until_idle(&supervisor, Duration::from_secs(2)).await;

    for handle in handles {
        assert_eq!(handle.join().unwrap(), WorkerExit::Finished);
    }
    assert_eq!(supervisor.active_workers(), 0);
    assert_eq!(notifier.count(), 0);
    assert_eq!(clock.pending(), 0);
    assert_eq!(supervisor.snapshot().phase, Phase::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stubborn_worker_is_given_up_and_orphaned() {
    let (supervisor, clock, notifier) = setup();
    let release = Arc::new(AtomicBool::new(false));
    let orphan = stubborn_script(&supervisor, &release);

    supervisor.request_stop(StopTimeout::Millis(50));
    wait_until_idle(&supervisor, Duration::from_secs(1)).await;

    let reports = notifier.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].owner, "pyext");
    assert_eq!(reports[0].remaining, 1);
    assert!(!supervisor.is_stopping());
    assert_eq!(clock.pending(), 0);

    // The orphan is still counted while it runs
    assert_eq!(supervisor.active_workers(), 1);

    release.store(true, Ordering::SeqCst);
    assert_eq!(orphan.join().unwrap(), WorkerExit::Finished);
    assert_eq!(supervisor.active_workers(), 0);

    // Nothing left: a new stop is a no-op and schedules nothing
    let outcome = supervisor.request_stop(StopTimeout::Default);
    assert_eq!(outcome.decision, StopDecision::NothingToStop);
    assert_eq!(clock.pending(), 0);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_impatient_second_request_wins() {
    let (supervisor, _clock, notifier) = setup();
    let release = Arc::new(AtomicBool::new(false));
    let orphan = stubborn_script(&supervisor, &release);

    supervisor.request_stop(StopTimeout::Millis(60_000));
    let outcome = supervisor.request_stop(StopTimeout::Millis(30));
    assert_eq!(outcome.ticks_remaining, 3);

    // Gives up on the short deadline, not the minute-long one
    wait_until_idle(&supervisor, Duration::from_secs(1)).await;
    assert_eq!(notifier.count(), 1);
    assert_eq!(notifier.reports()[0].stop_timeout_ms, 30);

    release.store(true, Ordering::SeqCst);
    orphan.join().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_workers_after_drain_are_not_told_to_exit() {
    let (supervisor, _clock, _notifier) = setup();

    let first = spawn_worker(&supervisor, "first", |token| {
        while !token.should_exit() {
            std::thread::sleep(WORKER_STOP_CHECK_INTERVAL);
        }
    })
    .unwrap();
    supervisor.request_stop(StopTimeout::Default);
    wait_until_idle(&supervisor, Duration::from_secs(2)).await;
    first.join().unwrap();

    let token = supervisor.stop_token();
    let _registration = supervisor.register_start();
    assert!(!token.should_exit());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tracing_notifier_end_to_end() {
    let clock = Arc::new(TokioClock::try_current().unwrap());
    let supervisor =
        ShutdownSupervisor::new("pyext", config(), clock, Arc::new(TracingNotifier::new()))
            .unwrap();
    let registration = supervisor.register_start();

    supervisor.request_stop(StopTimeout::Millis(0));
    wait_until_idle(&supervisor, Duration::from_secs(1)).await;

    assert_eq!(supervisor.active_workers(), 1);
    drop(registration);
    assert_eq!(supervisor.active_workers(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropping_owner_cancels_poll_and_releases_workers() {
    let (supervisor, clock, notifier) = setup();
    let worker = spawn_worker(&supervisor, "script", |token| {
        while !token.should_exit() {
            std::thread::sleep(WORKER_STOP_CHECK_INTERVAL);
        }
    })
    .unwrap();

    supervisor.request_stop(StopTimeout::Millis(5000));
    drop(supervisor);

    assert_eq!(clock.pending(), 0);
    assert_eq!(worker.join().unwrap(), WorkerExit::Finished);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(notifier.count(), 0);
}
