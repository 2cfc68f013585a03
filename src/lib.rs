// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{Mode, Settings, load_for_cli};
use crate::engine::{TickLoop, WatchLoop, spawn_signal_listener};
use crate::exec::reaper::become_subreaper;
use crate::exec::{OutputSink, ProcessSupervisor, Supervise, ZombieReaper};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{NotifyRegistry, TreeWatcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and settings resolution
/// - the process supervisor and the zombie reaper
/// - the file-watch or fixed-interval driver
/// - Ctrl-C / SIGTERM handling
///
/// Whatever way the driver ends, the supervised command is shut down before
/// this returns.
pub async fn run(args: CliArgs) -> Result<()> {
    let file = load_for_cli(args.config.as_deref())?;
    let settings = Settings::resolve(&args, &file)?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    settings.check_env_files(fs.as_ref())?;

    if args.dry_run {
        println!("respawn dry-run");
        println!("{settings}");
        debug!("dry-run complete (nothing started)");
        return Ok(());
    }

    let sink = OutputSink::stdout(settings.colored);
    let supervisor = Arc::new(ProcessSupervisor::with_fs(
        settings.command.clone(),
        sink.clone(),
        Arc::clone(&fs),
    ));

    let cancel = CancellationToken::new();
    let _signals = spawn_signal_listener(cancel.clone());
    become_subreaper();
    let reaper = ZombieReaper::spawn(cancel.clone());

    let driver = match &settings.mode {
        Mode::Watch(watch) => {
            let (registry, events) = NotifyRegistry::new()?;
            let mut tree = TreeWatcher::new(
                Arc::new(watch.filter.clone()),
                Arc::clone(&fs),
                Box::new(registry),
            );
            let count = tree
                .attach(&watch.root)
                .with_context(|| format!("watching {}", watch.root.display()))?;
            info!(directories = count, "file watch established");

            let watch_loop = WatchLoop::new(tree, events, Arc::clone(&supervisor), watch.delay);
            tokio::spawn(watch_loop.run(cancel.clone()))
        }
        Mode::Tick(tick) => {
            let mut tick_loop = TickLoop::new(Arc::clone(&supervisor), tick.interval);
            if tick.clear {
                tick_loop = tick_loop.clear_screen(sink.clone());
            }
            tokio::spawn(tick_loop.run(cancel.clone()))
        }
    };

    let outcome = match driver.await {
        Ok(res) => res.map_err(anyhow::Error::from),
        Err(join_err) => Err(anyhow!("driver task failed: {join_err}")),
    };

    // The drivers shut down on their own exit path; this covers a panic.
    supervisor.shutdown().await;

    cancel.cancel();
    if let Err(err) = reaper.await {
        debug!(error = %err, "zombie reaper task ended abnormally");
    }

    outcome
}
