// src/exec/supervisor.rs

//! Ownership of the one "current" child group.
//!
//! Every mutation of the current group goes through a single async mutex, so
//! a debounced restart racing the main loop (or a shutdown) is serialized and
//! the old group is always killed and reaped before the next one starts.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::exec::env::Environment;
use crate::exec::group::{ChildGroup, CommandSpec};
use crate::exec::sink::OutputSink;
use crate::fs::{FileSystem, RealFileSystem};

/// Boxed future returned by [`Supervise`] methods.
pub type SuperviseFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// What the loop drivers need from a supervisor.
///
/// Production code uses [`ProcessSupervisor`]; tests can provide their own
/// implementation that records calls instead of spawning processes.
pub trait Supervise: Send + Sync + 'static {
    /// Terminate and reap the current group (if any), then start a new one.
    fn restart(&self) -> SuperviseFuture<'_>;

    /// Terminate the current group (if any). Idempotent.
    fn shutdown(&self) -> SuperviseFuture<'_>;
}

#[derive(Debug, Default)]
struct State {
    current: Option<ChildGroup>,
    closed: bool,
}

/// Supervises one command; at most one live child group at any instant.
#[derive(Debug)]
pub struct ProcessSupervisor {
    spec: CommandSpec,
    sink: OutputSink,
    fs: Arc<dyn FileSystem>,
    state: Mutex<State>,
}

impl ProcessSupervisor {
    pub fn new(spec: CommandSpec, sink: OutputSink) -> Self {
        Self::with_fs(spec, sink, Arc::new(RealFileSystem))
    }

    pub fn with_fs(spec: CommandSpec, sink: OutputSink, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            spec,
            sink,
            fs,
            state: Mutex::new(State::default()),
        }
    }

    /// Pid of the current group leader, if one is running.
    pub async fn current_pid(&self) -> Option<u32> {
        self.state.lock().await.current.as_ref().map(ChildGroup::pid)
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Kill + reap the current group, then start a fresh one.
    ///
    /// A spawn failure is logged and leaves no current group; the next
    /// trigger simply tries again. Ignored once the supervisor is shut down.
    pub async fn restart_command(&self) -> Option<u32> {
        let mut state = self.state.lock().await;
        if state.closed {
            debug!("supervisor shut down; ignoring restart");
            return None;
        }

        info!("reloading");
        if let Some(old) = state.current.take() {
            old.kill().await;
        }

        let env = self.snapshot_env();
        match ChildGroup::start(&self.spec, &env, &self.sink) {
            Ok(group) => {
                let pid = group.pid();
                state.current = Some(group);
                Some(pid)
            }
            Err(err) => {
                error!(command = %self.spec, error = %err, "start command");
                None
            }
        }
    }

    /// Terminate the current group and refuse further restarts.
    pub async fn shutdown_command(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            debug!("supervisor already shut down");
            return;
        }
        state.closed = true;

        match state.current.take() {
            Some(group) => group.kill().await,
            None => debug!("no running command to stop"),
        }
    }

    fn snapshot_env(&self) -> Environment {
        if self.spec.env_files.is_empty() {
            return Environment::inherited();
        }
        match Environment::capture(self.fs.as_ref(), &self.spec.env_files) {
            Ok(env) => env,
            Err(err) => {
                error!(error = %format!("{err:#}"), "read environment");
                Environment::inherited()
            }
        }
    }
}

impl Supervise for ProcessSupervisor {
    fn restart(&self) -> SuperviseFuture<'_> {
        Box::pin(async move {
            self.restart_command().await;
        })
    }

    fn shutdown(&self) -> SuperviseFuture<'_> {
        Box::pin(self.shutdown_command())
    }
}
