// src/watch/tree.rs

//! Per-directory watch subscriptions over a directory tree.
//!
//! `notify` is used in non-recursive mode: every directory admitted by the
//! [`PathFilter`] gets its own subscription, and directories created later
//! are subscribed incrementally as their creation events arrive. This keeps
//! excluded trees (`.git`, `node_modules`, ...) out of the OS watch table.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::{EntryKind, FileSystem};
use crate::watch::filter::PathFilter;
use crate::watch::path_utils::{extension_of, match_key};

/// Receiving end of the notification stream.
pub type NotifyEvents = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Something that can subscribe a single directory for change notification.
///
/// Production code uses [`NotifyRegistry`]; tests record the calls.
pub trait WatchRegistry: Send {
    fn subscribe(&mut self, dir: &Path) -> anyhow::Result<()>;
}

/// `notify`-backed registry. Dropping it stops all subscriptions.
pub struct NotifyRegistry {
    inner: RecommendedWatcher,
}

impl fmt::Debug for NotifyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyRegistry").finish_non_exhaustive()
    }
}

impl NotifyRegistry {
    /// Acquire the OS notification handle.
    ///
    /// Events and watcher errors are forwarded, in delivery order, over the
    /// returned channel. The channel closes once the registry is dropped.
    pub fn new() -> Result<(Self, NotifyEvents)> {
        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver only goes away during shutdown.
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok((Self { inner }, rx))
    }
}

impl WatchRegistry for NotifyRegistry {
    fn subscribe(&mut self, dir: &Path) -> anyhow::Result<()> {
        self.inner
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {:?}", dir))
    }
}

/// What to do with one path of a notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not interesting.
    Ignore,
    /// A directory appeared; extend coverage to its subtree.
    WatchDirectory,
    /// A watched path went away; drop it from the watched set.
    Forget,
    /// An actionable file changed; arm the debouncer.
    Trigger,
}

/// Only creation, write and rename kinds are candidate triggers.
fn is_candidate(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Data(_)) => true,
        EventKind::Modify(ModifyKind::Name(_)) => true,
        // Some backends cannot tell what changed.
        EventKind::Modify(ModifyKind::Any) => true,
        _ => false,
    }
}

/// Directory "appeared" events: created, or renamed into place.
fn is_appearance(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(
                RenameMode::To | RenameMode::Both | RenameMode::Any
            ))
    )
}

/// Owns the watched set and the registry; applies the admission policy.
pub struct TreeWatcher {
    root: PathBuf,
    filter: Arc<PathFilter>,
    fs: Arc<dyn FileSystem>,
    registry: Box<dyn WatchRegistry>,
    watched: HashSet<PathBuf>,
}

impl fmt::Debug for TreeWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeWatcher")
            .field("root", &self.root)
            .field("watched", &self.watched.len())
            .finish_non_exhaustive()
    }
}

impl TreeWatcher {
    pub fn new(
        filter: Arc<PathFilter>,
        fs: Arc<dyn FileSystem>,
        registry: Box<dyn WatchRegistry>,
    ) -> Self {
        Self {
            root: PathBuf::new(),
            filter,
            fs,
            registry,
            watched: HashSet::new(),
        }
    }

    /// Walk `root` and subscribe every admitted directory.
    ///
    /// Failing to read the root itself is fatal. Anything below the root that
    /// cannot be read or subscribed is logged and skipped.
    pub fn attach(&mut self, root: &Path) -> Result<usize> {
        let root = self
            .fs
            .canonicalize(root)
            .unwrap_or_else(|_| root.to_path_buf());
        debug!(root = %root.display(), "attaching tree watcher");

        self.fs
            .read_dir(&root)
            .with_context(|| format!("walking watch root {:?}", root))?;

        self.root = root.clone();
        Ok(self.walk(&root))
    }

    /// Extend coverage to a newly created directory and its subtree.
    pub fn extend(&mut self, dir: &Path) -> anyhow::Result<usize> {
        // Surface an unreadable top directory to the caller.
        self.fs.read_dir(dir)?;
        Ok(self.walk(dir))
    }

    /// Drop a directory (and everything under it) from the watched set.
    ///
    /// The OS removes the subscription on its own when a directory is deleted.
    pub fn forget(&mut self, dir: &Path) -> bool {
        let before = self.watched.len();
        self.watched.retain(|p| !p.starts_with(dir));
        before != self.watched.len()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_watched(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }

    /// Snapshot of the watched directories, sorted.
    pub fn watched(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.watched.iter().cloned().collect();
        dirs.sort();
        dirs
    }

    /// Classify one path of a notification event.
    ///
    /// A path that cannot be stat'ed any more is dropped, except that a
    /// removed directory we were watching is forgotten.
    pub fn disposition(&self, kind: &EventKind, path: &Path) -> Disposition {
        if matches!(kind, EventKind::Remove(_)) {
            return if self.watched.contains(path) {
                Disposition::Forget
            } else {
                Disposition::Ignore
            };
        }

        if !is_candidate(kind) {
            return Disposition::Ignore;
        }

        let entry = match self.fs.stat(path) {
            Ok(entry) => entry,
            Err(_) => {
                if matches!(kind, EventKind::Modify(ModifyKind::Name(RenameMode::From)))
                    && self.watched.contains(path)
                {
                    return Disposition::Forget;
                }
                return Disposition::Ignore;
            }
        };

        match entry {
            EntryKind::Dir if is_appearance(kind) && !self.watched.contains(path) => {
                Disposition::WatchDirectory
            }
            EntryKind::Dir => Disposition::Ignore,
            EntryKind::File => {
                let key = match_key(&self.root, path);
                if self.filter.is_actionable(&key, &extension_of(path)) {
                    Disposition::Trigger
                } else {
                    Disposition::Ignore
                }
            }
        }
    }

    fn walk(&mut self, start: &Path) -> usize {
        let mut added = 0;
        let mut stack = vec![start.to_path_buf()];

        while let Some(dir) = stack.pop() {
            let key = match_key(&self.root, &dir);
            if self.filter.admits_directory(&key) && !self.watched.contains(&dir) {
                match self.registry.subscribe(&dir) {
                    Ok(()) => {
                        debug!(path = %dir.display(), "add path");
                        self.watched.insert(dir.clone());
                        added += 1;
                    }
                    Err(err) => {
                        warn!(path = %dir.display(), error = %err, "failed to watch directory; skipping");
                    }
                }
            }

            // Descend regardless: an inclusion rule may re-admit a subdirectory
            // of an excluded one.
            let entries = match self.fs.read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(path = %dir.display(), error = %err, "cannot read directory; skipping subtree");
                    continue;
                }
            };
            for entry in entries {
                if !self.fs.is_symlink(&entry) && self.fs.is_dir(&entry) {
                    stack.push(entry);
                }
            }
        }

        added
    }
}
