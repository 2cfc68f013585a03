use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use respawn::watch::WatchRegistry;

/// A fake watch registry that records subscribed directories and can be told
/// to refuse some of them.
#[derive(Debug, Clone, Default)]
pub struct RecordingRegistry {
    subscribed: Arc<Mutex<Vec<PathBuf>>>,
    refuse: Arc<Mutex<HashSet<PathBuf>>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `subscribe` fail for exactly this directory.
    pub fn refuse(&self, dir: impl AsRef<Path>) {
        self.refuse
            .lock()
            .unwrap()
            .insert(dir.as_ref().to_path_buf());
    }

    /// Subscribed directories, in subscription order.
    pub fn subscribed(&self) -> Vec<PathBuf> {
        self.subscribed.lock().unwrap().clone()
    }

    /// Subscribed directories, sorted.
    pub fn subscribed_sorted(&self) -> Vec<PathBuf> {
        let mut dirs = self.subscribed();
        dirs.sort();
        dirs
    }

    pub fn boxed(&self) -> Box<dyn WatchRegistry> {
        Box::new(self.clone())
    }
}

impl WatchRegistry for RecordingRegistry {
    fn subscribe(&mut self, dir: &Path) -> anyhow::Result<()> {
        if self.refuse.lock().unwrap().contains(dir) {
            bail!("refusing to watch {:?}", dir);
        }
        self.subscribed.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }
}
