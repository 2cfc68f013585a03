use std::sync::{Arc, Mutex};

use tokio::time::Instant;
use respawn::exec::{Supervise, SuperviseFuture};

/// A fake supervisor that:
/// - records the instant of every restart
/// - counts shutdowns
/// - never spawns anything.
///
/// Clones share the same log, so a test can keep one handle while the loop
/// under test owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingSupervisor {
    restarts: Arc<Mutex<Vec<Instant>>>,
    shutdowns: Arc<Mutex<usize>>,
}

impl RecordingSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restart_count(&self) -> usize {
        self.restarts.lock().unwrap().len()
    }

    pub fn restarts(&self) -> Vec<Instant> {
        self.restarts.lock().unwrap().clone()
    }

    pub fn last_restart(&self) -> Option<Instant> {
        self.restarts.lock().unwrap().last().copied()
    }

    pub fn shutdown_count(&self) -> usize {
        *self.shutdowns.lock().unwrap()
    }
}

impl Supervise for RecordingSupervisor {
    fn restart(&self) -> SuperviseFuture<'_> {
        Box::pin(async move {
            self.restarts.lock().unwrap().push(Instant::now());
        })
    }

    fn shutdown(&self) -> SuperviseFuture<'_> {
        Box::pin(async move {
            *self.shutdowns.lock().unwrap() += 1;
        })
    }
}
