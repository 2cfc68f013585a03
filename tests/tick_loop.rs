use std::sync::Arc;
use std::time::Duration;

use respawn::engine::TickLoop;
use respawn::exec::OutputSink;
use respawn::exec::sink::CLEAR_SCREEN;
use respawn_test_utils::{RecordingSupervisor, init_tracing, with_timeout};
use tokio::io::AsyncReadExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn starts_immediately_then_once_per_period() {
    init_tracing();
    let supervisor = RecordingSupervisor::new();
    let period = Duration::from_millis(300);
    let cancel = CancellationToken::new();

    let tick_loop = TickLoop::new(Arc::new(supervisor.clone()), period);
    let handle = tokio::spawn(tick_loop.run(cancel.clone()));

    sleep(Duration::from_millis(1050)).await;
    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();

    // t = 0, 300, 600, 900
    assert_eq!(supervisor.restart_count(), 4);
    assert_eq!(supervisor.shutdown_count(), 1);

    let starts = supervisor.restarts();
    for pair in starts.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(250));
    }
}

#[tokio::test]
async fn cancellation_before_first_tick_still_shuts_down() {
    let supervisor = RecordingSupervisor::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let tick_loop = TickLoop::new(Arc::new(supervisor.clone()), Duration::from_secs(60));
    with_timeout(tick_loop.run(cancel)).await.unwrap();

    assert_eq!(supervisor.restart_count(), 1);
    assert_eq!(supervisor.shutdown_count(), 1);
}

#[tokio::test]
async fn clear_screen_precedes_each_tick_run() {
    let (writer, mut reader) = tokio::io::duplex(4096);
    let sink = OutputSink::from_writer(writer, true);
    let supervisor = RecordingSupervisor::new();
    let cancel = CancellationToken::new();

    let tick_loop = TickLoop::new(Arc::new(supervisor.clone()), Duration::from_millis(100))
        .clear_screen(sink);
    let handle = tokio::spawn(tick_loop.run(cancel.clone()));

    sleep(Duration::from_millis(250)).await;
    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();

    let mut out = String::new();
    reader.read_to_string(&mut out).await.unwrap();

    // The immediate first run is not preceded by a clear.
    let clears = out.matches(CLEAR_SCREEN).count();
    assert_eq!(clears, supervisor.restart_count() - 1);
    assert!(clears >= 1);
}

#[tokio::test]
async fn unschedulable_period_runs_once_and_waits_for_cancel() {
    let supervisor = RecordingSupervisor::new();
    let cancel = CancellationToken::new();

    let tick_loop = TickLoop::new(Arc::new(supervisor.clone()), Duration::MAX);
    let handle = tokio::spawn(tick_loop.run(cancel.clone()));

    sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());
    assert_eq!(supervisor.restart_count(), 1);

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(supervisor.shutdown_count(), 1);
}
