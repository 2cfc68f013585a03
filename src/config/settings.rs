// src/config/settings.rs

//! Effective settings: CLI flags layered over the config file layered over
//! built-in defaults.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{CliArgs, ModeArgs};
use crate::config::duration::parse_positive_duration;
use crate::config::model::ConfigFile;
use crate::errors::{RespawnError, Result};
use crate::exec::env::{Environment, resolve_env_files};
use crate::exec::CommandSpec;
use crate::fs::FileSystem;
use crate::watch::PathFilter;

pub const DEFAULT_EXCLUSIONS: &[&str] =
    &[".git", ".ds_store", ".idea", ".vscode", "node_modules", "script"];
pub const DEFAULT_EXTENSIONS: &[&str] = &[".go", ".env", ".mod"];
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    pub command: CommandSpec,
    pub colored: bool,
}

#[derive(Debug, Clone)]
pub enum Mode {
    Watch(WatchSettings),
    Tick(TickSettings),
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub root: PathBuf,
    pub exclusions: Vec<String>,
    pub inclusions: Vec<String>,
    pub extensions: Vec<String>,
    pub delay: Duration,
    pub filter: PathFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSettings {
    pub interval: Duration,
    pub clear: bool,
}

impl Settings {
    pub fn resolve(args: &CliArgs, file: &ConfigFile) -> Result<Self> {
        let mode = match &args.mode {
            ModeArgs::File(f) => {
                let section = &file.file;
                let exclusions = pick_rules(&f.exclusions, &section.exclusions, DEFAULT_EXCLUSIONS);
                let inclusions = pick_rules(&f.inclusions, &section.inclusions, &[]);
                let extensions = pick_rules(&f.extensions, &section.extensions, DEFAULT_EXTENSIONS);
                let delay = pick_duration("file.delay", f.delay, section.delay.as_deref(), DEFAULT_DELAY)?;
                let root = f
                    .root
                    .clone()
                    .or_else(|| section.root.clone())
                    .unwrap_or_else(|| PathBuf::from("."));
                let filter = PathFilter::from_rules(&exclusions, &inclusions, &extensions)?;

                Mode::Watch(WatchSettings {
                    root,
                    exclusions,
                    inclusions,
                    extensions,
                    delay,
                    filter,
                })
            }
            ModeArgs::Command(t) => {
                let section = &file.command;
                let interval = pick_duration(
                    "command.interval",
                    t.interval,
                    section.interval.as_deref(),
                    DEFAULT_INTERVAL,
                )?;
                let clear = t.clear || section.clear.unwrap_or(false);
                Mode::Tick(TickSettings { interval, clear })
            }
        };

        let env_values = if args.env_files.is_empty() {
            file.env.files.clone().unwrap_or_default()
        } else {
            args.env_files.clone()
        };

        let command = CommandSpec::from_argv(args.mode.command())
            .ok_or_else(|| RespawnError::Config("no command given to supervise".to_string()))?
            .with_env_files(resolve_env_files(&env_values));

        Ok(Self {
            mode,
            command,
            colored: !args.no_color,
        })
    }

    /// Read every env file once so a typo fails at startup rather than on
    /// the first restart.
    pub fn check_env_files(&self, fs: &dyn FileSystem) -> Result<Environment> {
        Environment::capture(fs, &self.command.env_files).map_err(|e| {
            RespawnError::Config(format!("env files: {e:#}"))
        })
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "command: {}", self.command)?;
        match &self.mode {
            Mode::Watch(w) => {
                writeln!(f, "mode: file")?;
                writeln!(f, "  root: {}", w.root.display())?;
                writeln!(f, "  exclusions: {:?}", w.exclusions)?;
                writeln!(f, "  inclusions: {:?}", w.inclusions)?;
                writeln!(f, "  extensions: {:?}", w.extensions)?;
                writeln!(f, "  delay: {:?}", w.delay)?;
            }
            Mode::Tick(t) => {
                writeln!(f, "mode: command")?;
                writeln!(f, "  interval: {:?}", t.interval)?;
                writeln!(f, "  clear: {}", t.clear)?;
            }
        }
        if self.command.env_files.is_empty() {
            writeln!(f, "env files: (none)")?;
        } else {
            for file in &self.command.env_files {
                writeln!(f, "env file: {}", file.display())?;
            }
        }
        write!(f, "colored output: {}", self.colored)
    }
}

fn pick_rules(cli: &Option<Vec<String>>, file: &Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    cli.clone()
        .or_else(|| file.clone())
        .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
}

fn pick_duration(
    key: &str,
    cli: Option<Duration>,
    file: Option<&str>,
    default: Duration,
) -> Result<Duration> {
    if let Some(d) = cli {
        return Ok(d);
    }
    match file {
        Some(raw) => parse_positive_duration(raw)
            .map_err(|e| RespawnError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}
