// src/engine/watch_loop.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use notify::Event;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::exec::Supervise;
use crate::watch::{Debouncer, Disposition, NotifyEvents, TreeWatcher};

/// File-mode driver: notifications in, debounced restarts out.
///
/// The loop waits on whichever comes first of cancellation or the next
/// notification. Watcher errors are logged and the loop keeps going; only a
/// closed notification channel or cancellation ends it. On the way out the
/// pending debounce timer is dropped and the supervisor is shut down.
///
/// Tree updates stat and walk the filesystem, so each event is applied on the
/// blocking pool. Events are still handled one at a time, which means a large
/// new subtree delays the next event (and cancellation) until its walk ends.
pub struct WatchLoop<S: Supervise> {
    tree: Arc<Mutex<TreeWatcher>>,
    events: NotifyEvents,
    supervisor: Arc<S>,
    quiet: Duration,
    debouncer: Debouncer,
}

impl<S: Supervise> fmt::Debug for WatchLoop<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchLoop")
            .field("tree", &self.tree)
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}

impl<S: Supervise> WatchLoop<S> {
    /// `tree` must already be attached to its root.
    pub fn new(tree: TreeWatcher, events: NotifyEvents, supervisor: Arc<S>, quiet: Duration) -> Self {
        Self {
            tree: Arc::new(Mutex::new(tree)),
            events,
            supervisor,
            quiet,
            debouncer: Debouncer::new(),
        }
    }

    /// Start the command, then restart it on every debounced change.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let root = lock(&self.tree).root().to_path_buf();
        info!(root = %root.display(), quiet = ?self.quiet, "watching files");

        // Run once up front.
        self.supervisor.restart().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("cancellation requested; stopping watch loop");
                    break;
                }
                received = self.events.recv() => match received {
                    Some(Ok(event)) => self.handle_event(event).await,
                    Some(Err(err)) => error!(error = %err, "received error"),
                    None => {
                        debug!("notification channel closed");
                        break;
                    }
                },
            }
        }

        self.debouncer.cancel();
        self.supervisor.shutdown().await;
        debug!("watch loop finished");
        Ok(())
    }

    async fn handle_event(&mut self, event: Event) {
        let tree = Arc::clone(&self.tree);
        let triggered = match tokio::task::spawn_blocking(move || apply_event(&tree, &event)).await {
            Ok(triggered) => triggered,
            Err(err) => {
                error!(error = %err, "applying notification to the watch tree failed");
                return;
            }
        };

        for path in triggered {
            let supervisor = Arc::clone(&self.supervisor);
            let changed = path.display().to_string();
            self.debouncer.arm(self.quiet, async move {
                info!(path = %changed, "change settled; restarting");
                supervisor.restart().await;
            });
        }
    }
}

fn lock(tree: &Mutex<TreeWatcher>) -> MutexGuard<'_, TreeWatcher> {
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Update the watched set for one notification and return the paths that
/// should (re)arm the restart timer.
fn apply_event(tree: &Mutex<TreeWatcher>, event: &Event) -> Vec<PathBuf> {
    let mut tree = lock(tree);
    let mut triggered = Vec::new();
    for path in &event.paths {
        match tree.disposition(&event.kind, path) {
            Disposition::Ignore => {}
            Disposition::Forget => {
                if tree.forget(path) {
                    debug!(path = %path.display(), "remove path");
                }
            }
            Disposition::WatchDirectory => match tree.extend(path) {
                Ok(added) => info!(path = %path.display(), added, "add path"),
                Err(err) => debug!(path = %path.display(), error = %err, "add path"),
            },
            Disposition::Trigger => {
                debug!(path = %path.display(), kind = ?event.kind, "change detected");
                triggered.push(path.clone());
            }
        }
    }
    triggered
}
