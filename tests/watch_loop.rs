use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use notify::event::{CreateKind, DataChange, EventKind, ModifyKind};
use notify::Event;
use respawn::engine::WatchLoop;
use respawn::fs::mock::MockFileSystem;
use respawn::fs::{FileSystem, RealFileSystem};
use respawn::watch::{NotifyRegistry, TreeWatcher};
use respawn_test_utils::builders::PathFilterBuilder;
use respawn_test_utils::{RecordingRegistry, RecordingSupervisor, init_tracing, with_timeout};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

type EventTx = mpsc::UnboundedSender<notify::Result<Event>>;

fn write_event(path: &str) -> notify::Result<Event> {
    Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(PathBuf::from(path)))
}

/// A mock project tree wired to a synthetic event channel.
fn mock_loop(
    fs: &MockFileSystem,
    supervisor: &RecordingSupervisor,
    quiet: Duration,
) -> (WatchLoop<RecordingSupervisor>, EventTx) {
    let filter = PathFilterBuilder::new().exclude(".git").extension(".go").build();
    let registry = RecordingRegistry::new();
    let mut tree = TreeWatcher::new(
        Arc::new(filter),
        Arc::new(fs.clone()) as Arc<dyn FileSystem>,
        registry.boxed(),
    );
    tree.attach(Path::new("/proj")).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let watch_loop = WatchLoop::new(tree, rx, Arc::new(supervisor.clone()), quiet);
    (watch_loop, tx)
}

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/main.go", "package main");
    fs.add_file("/proj/README.md", "# proj");
    fs.add_dir("/proj/.git");
    fs
}

/// Delays `read_dir` below one directory, like a large tree on a cold cache.
#[derive(Debug)]
struct SlowFs {
    inner: MockFileSystem,
    slow_under: PathBuf,
}

impl FileSystem for SlowFs {
    fn read_to_string(&self, path: &Path) -> anyhow::Result<String> {
        self.inner.read_to_string(path)
    }

    fn stat(&self, path: &Path) -> anyhow::Result<respawn::fs::EntryKind> {
        self.inner.stat(path)
    }

    fn canonicalize(&self, path: &Path) -> anyhow::Result<PathBuf> {
        self.inner.canonicalize(path)
    }

    fn read_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        if path.starts_with(&self.slow_under) {
            std::thread::sleep(Duration::from_millis(100));
        }
        self.inner.read_dir(path)
    }
}

#[tokio::test]
async fn burst_of_writes_restarts_once_after_quiet_period() {
    init_tracing();
    let fs = project();
    let supervisor = RecordingSupervisor::new();
    let quiet = Duration::from_millis(500);
    let (watch_loop, tx) = mock_loop(&fs, &supervisor, quiet);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(cancel.clone()));

    // Let the initial start happen.
    sleep(Duration::from_millis(50)).await;
    assert_eq!(supervisor.restart_count(), 1);

    let mut last_write = Instant::now();
    for _ in 0..3 {
        tx.send(write_event("/proj/main.go")).unwrap();
        last_write = Instant::now();
        sleep(Duration::from_millis(50)).await;
    }

    sleep(Duration::from_millis(900)).await;
    assert_eq!(supervisor.restart_count(), 2, "burst must collapse into one restart");
    let fired = supervisor.last_restart().unwrap();
    assert!(fired.duration_since(last_write) >= quiet);

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(supervisor.shutdown_count(), 1);
}

#[tokio::test]
async fn irrelevant_changes_do_not_restart() {
    let fs = project();
    let supervisor = RecordingSupervisor::new();
    let (watch_loop, tx) = mock_loop(&fs, &supervisor, Duration::from_millis(100));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(cancel.clone()));

    fs.add_file("/proj/.git/x.go", "package x");
    let created = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/proj/.git/x.go"));
    tx.send(Ok(created)).unwrap();
    tx.send(write_event("/proj/README.md")).unwrap();
    tx.send(write_event("/proj/deleted.go")).unwrap();

    sleep(Duration::from_millis(300)).await;
    assert_eq!(supervisor.restart_count(), 1);

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn new_directory_is_watched_and_its_files_trigger() {
    let fs = project();
    let supervisor = RecordingSupervisor::new();
    let (watch_loop, tx) = mock_loop(&fs, &supervisor, Duration::from_millis(100));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(cancel.clone()));

    fs.add_file("/proj/pkg/util.go", "package pkg");
    let created = Event::new(EventKind::Create(CreateKind::Folder)).add_path(PathBuf::from("/proj/pkg"));
    tx.send(Ok(created)).unwrap();
    tx.send(write_event("/proj/pkg/util.go")).unwrap();

    sleep(Duration::from_millis(400)).await;
    assert_eq!(supervisor.restart_count(), 2);

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn watcher_errors_are_not_fatal() {
    let fs = project();
    let supervisor = RecordingSupervisor::new();
    let (watch_loop, tx) = mock_loop(&fs, &supervisor, Duration::from_millis(100));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(cancel.clone()));

    tx.send(Err(notify::Error::generic("queue overflow"))).unwrap();
    tx.send(write_event("/proj/main.go")).unwrap();

    sleep(Duration::from_millis(400)).await;
    assert!(!handle.is_finished());
    assert_eq!(supervisor.restart_count(), 2);

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn closed_channel_ends_the_loop_with_shutdown() {
    let fs = project();
    let supervisor = RecordingSupervisor::new();
    let (watch_loop, tx) = mock_loop(&fs, &supervisor, Duration::from_millis(100));

    let handle = tokio::spawn(watch_loop.run(CancellationToken::new()));
    drop(tx);

    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(supervisor.restart_count(), 1);
    assert_eq!(supervisor.shutdown_count(), 1);
}

#[tokio::test]
async fn cancellation_drops_a_pending_restart() {
    let fs = project();
    let supervisor = RecordingSupervisor::new();
    let (watch_loop, tx) = mock_loop(&fs, &supervisor, Duration::from_millis(300));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(cancel.clone()));

    tx.send(write_event("/proj/main.go")).unwrap();
    sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();

    sleep(Duration::from_millis(400)).await;
    assert_eq!(supervisor.restart_count(), 1);
    assert_eq!(supervisor.shutdown_count(), 1);
}

#[tokio::test]
async fn real_directory_change_triggers_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/main.go"), "package main\n").unwrap();

    let filter = PathFilterBuilder::new().exclude(".git").extension(".go").build();
    let (registry, events) = NotifyRegistry::new().unwrap();
    let mut tree = TreeWatcher::new(Arc::new(filter), Arc::new(RealFileSystem), Box::new(registry));
    assert_eq!(tree.attach(dir.path()).unwrap(), 2);

    let supervisor = RecordingSupervisor::new();
    let cancel = CancellationToken::new();
    let watch_loop = WatchLoop::new(tree, events, Arc::new(supervisor.clone()), Duration::from_millis(100));
    let handle = tokio::spawn(watch_loop.run(cancel.clone()));

    sleep(Duration::from_millis(100)).await;
    std::fs::write(dir.path().join("src/main.go"), "package main\n\nfunc main() {}\n").unwrap();

    with_timeout(async {
        while supervisor.restart_count() < 2 {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(supervisor.shutdown_count(), 1);
}

#[tokio::test]
async fn walking_a_new_subtree_does_not_stall_the_runtime() {
    let fs = project();
    let slow = SlowFs {
        inner: fs.clone(),
        slow_under: PathBuf::from("/proj/vendor"),
    };
    let registry = RecordingRegistry::new();
    let mut tree = TreeWatcher::new(
        Arc::new(PathFilterBuilder::new().exclude(".git").extension(".go").build()),
        Arc::new(slow) as Arc<dyn FileSystem>,
        registry.boxed(),
    );
    tree.attach(Path::new("/proj")).unwrap();

    let supervisor = RecordingSupervisor::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let watch_loop = WatchLoop::new(tree, rx, Arc::new(supervisor.clone()), Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watch_loop.run(cancel.clone()));
    sleep(Duration::from_millis(50)).await;

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = tokio::spawn({
        let ticks = Arc::clone(&ticks);
        async move {
            loop {
                sleep(Duration::from_millis(10)).await;
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    // Four slow reads: the top-level check plus vendor, a and b in the walk.
    fs.add_dir("/proj/vendor/a");
    fs.add_dir("/proj/vendor/b");
    let created = Event::new(EventKind::Create(CreateKind::Folder)).add_path(PathBuf::from("/proj/vendor"));
    tx.send(Ok(created)).unwrap();

    sleep(Duration::from_millis(250)).await;
    assert!(
        ticks.load(Ordering::SeqCst) >= 10,
        "runtime starved while the walk ran: {} ticks",
        ticks.load(Ordering::SeqCst)
    );
    ticker.abort();

    sleep(Duration::from_millis(400)).await;
    let subscribed = registry.subscribed();
    for dir in ["/proj/vendor", "/proj/vendor/a", "/proj/vendor/b"] {
        assert!(subscribed.contains(&PathBuf::from(dir)), "{dir} not watched: {subscribed:?}");
    }

    cancel.cancel();
    with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(supervisor.restart_count(), 1);
}
