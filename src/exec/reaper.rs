// src/exec/reaper.rs

//! Background collector for terminated children nobody else waits for.
//!
//! The supervised command may leave grandchildren behind that end up
//! parented to us. The reaper is not told which pids to expect: on every
//! `SIGCHLD` it drains `waitpid(-1, WNOHANG)` until nothing is pending.
//! On Linux the process registers as a child subreaper first, so orphaned
//! grandchildren are reparented here rather than to init.

use std::time::Duration;

use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Poll period when `SIGCHLD` cannot be subscribed.
pub const FALLBACK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Result of a single non-blocking reap attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// A terminated child was collected.
    Reaped(Pid),
    /// Children exist but none has terminated.
    NonePending,
    /// There are no children at all.
    NoChildren,
}

/// One `waitpid(-1, WNOHANG)`. Never blocks.
pub fn reap_once() -> nix::Result<ReapOutcome> {
    match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::StillAlive) => Ok(ReapOutcome::NonePending),
        Ok(status) => match status.pid() {
            Some(pid) => Ok(ReapOutcome::Reaped(pid)),
            None => Ok(ReapOutcome::NonePending),
        },
        Err(Errno::ECHILD) => Ok(ReapOutcome::NoChildren),
        Err(errno) => Err(errno),
    }
}

/// Reap until nothing is pending. Returns how many children were collected.
///
/// Errors other than "no children" are logged and end this round; the next
/// round starts on the next wake-up.
pub fn reap_pending() -> usize {
    let mut reaped = 0;
    loop {
        match reap_once() {
            Ok(ReapOutcome::Reaped(pid)) => {
                debug!(pid = pid.as_raw(), "reaped zombie process ({pid})");
                reaped += 1;
            }
            Ok(ReapOutcome::NonePending | ReapOutcome::NoChildren) => break,
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                error!(error = %errno, "wait for child process");
                break;
            }
        }
    }
    reaped
}

/// Ask the kernel to reparent orphaned descendants to this process instead
/// of init, so the reaper can collect them.
///
/// Failure is logged; supervision still works, orphans are then init's job.
#[cfg(target_os = "linux")]
pub fn become_subreaper() -> bool {
    match nix::sys::prctl::set_child_subreaper(true) {
        Ok(()) => {
            debug!("registered as child subreaper");
            true
        }
        Err(errno) => {
            warn!(error = %errno, "cannot become child subreaper; orphans go to init");
            false
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn become_subreaper() -> bool {
    debug!("child subreaper not supported on this platform");
    false
}

/// Handle to the background reaper task.
#[derive(Debug)]
pub struct ZombieReaper;

impl ZombieReaper {
    /// Spawn the reaper. It runs until `cancel` fires.
    pub fn spawn(cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            match signal(SignalKind::child()) {
                Ok(mut sigchld) => loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        received = sigchld.recv() => {
                            if received.is_none() {
                                warn!("SIGCHLD stream ended; falling back to polling");
                                poll_until_cancelled(&cancel).await;
                                break;
                            }
                            reap_pending();
                        }
                    }
                },
                Err(err) => {
                    warn!(error = %err, "cannot subscribe to SIGCHLD; polling for zombies");
                    poll_until_cancelled(&cancel).await;
                }
            }
            debug!("zombie reaper stopped");
        })
    }
}

async fn poll_until_cancelled(cancel: &CancellationToken) {
    let mut ticker = tokio::time::interval(FALLBACK_POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                reap_pending();
            }
        }
    }
}
