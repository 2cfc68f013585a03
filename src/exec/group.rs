// src/exec/group.rs

//! One supervised child process group.
//!
//! The command is spawned as the leader of a fresh process group, so a single
//! `killpg` reaches the leader and every descendant that stayed in the group.

use std::fmt;
use std::process::Stdio;

use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::{RespawnError, Result};
use crate::exec::env::Environment;
use crate::exec::sink::OutputSink;

/// Program + arguments + env files of the supervised command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env_files: Vec<std::path::PathBuf>,
}

impl CommandSpec {
    pub fn new<P: Into<String>>(program: P, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env_files: Vec::new(),
        }
    }

    pub fn with_env_files(mut self, files: Vec<std::path::PathBuf>) -> Self {
        self.env_files = files;
        self
    }

    /// Build from `program arg1 arg2 ...`; `None` if `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A running child group. Replaced, never mutated, on restart.
pub struct ChildGroup {
    pid: u32,
    child: Child,
    pumps: Vec<JoinHandle<()>>,
    reaped: bool,
}

impl fmt::Debug for ChildGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildGroup")
            .field("pid", &self.pid)
            .field("reaped", &self.reaped)
            .finish_non_exhaustive()
    }
}

impl ChildGroup {
    /// Spawn `spec` as a new process-group leader and return immediately.
    ///
    /// stdin is inherited; stdout and stderr are pumped into `sink`.
    pub fn start(spec: &CommandSpec, env: &Environment, sink: &OutputSink) -> Result<Self> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(env.overrides().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let mut child = cmd.spawn().map_err(|source| RespawnError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let pid = child.id().ok_or_else(|| {
            RespawnError::Other(anyhow::anyhow!("spawned '{}' has no pid", spec.program))
        })?;

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(sink.pump(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(sink.pump(stderr, "stderr"));
        }

        info!(pid, "started ({pid})");

        Ok(Self {
            pid,
            child,
            pumps,
            reaped: false,
        })
    }

    /// Process id of the leader; also the process-group id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// SIGKILL the whole group, then block until the leader is reaped.
    ///
    /// Both the signal and the wait race against natural exit (or the zombie
    /// reaper collecting the leader first); those failures are only noted at
    /// debug level.
    pub async fn kill(mut self) {
        let pid = self.pid;
        info!(pid, "killing ({pid})");

        if self.group_id_is_ours() {
            if let Err(errno) = self.signal_group() {
                debug!(pid, error = %errno, "kill process group");
            }
        }

        match self.child.wait().await {
            Ok(status) => debug!(pid, %status, "process group leader reaped"),
            Err(err) => debug!(pid, error = %err, "wait for killed process"),
        }
        self.reaped = true;

        // Whatever is still buffered belongs to a dead child.
        for pump in self.pumps.drain(..) {
            pump.abort();
        }

        info!(pid, "killed ({pid})");
    }

    /// While the leader is alive or an unreaped zombie its pid cannot be
    /// reused, so the group id still names our group. Once somebody else has
    /// reaped the leader that no longer holds and the group is left alone.
    fn group_id_is_ours(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(pid = self.pid, %status, "process group leader already exited");
                true
            }
            Err(err) => {
                debug!(pid = self.pid, error = %err, "process group leader reaped elsewhere; not signalling");
                false
            }
        }
    }

    fn signal_group(&self) -> nix::Result<()> {
        let pgid = i32::try_from(self.pid).map_err(|_| nix::errno::Errno::EINVAL)?;
        killpg(Pid::from_raw(pgid), Signal::SIGKILL)
    }
}

impl Drop for ChildGroup {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        // Last-resort release on paths that skipped `kill` (panics, early returns).
        if self.group_id_is_ours() {
            if let Err(errno) = self.signal_group() {
                debug!(pid = self.pid, error = %errno, "kill process group on drop");
            }
        }
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
    }
}
