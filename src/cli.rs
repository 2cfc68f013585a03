// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::duration::parse_positive_duration;

/// Command-line arguments for `respawn`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "respawn",
    version,
    about = "Restart a command when files change, or re-run it on a fixed interval.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a config file (TOML).
    ///
    /// Default: `Respawn.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Env files loaded for every start (comma-separated or repeated).
    ///
    /// `off` disables env files; `.` means `./.env`.
    #[arg(long = "env", global = true, value_name = "FILE", value_delimiter = ',')]
    pub env_files: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RESPAWN_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Do not tint the command's output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Resolve and print the effective settings, but don't run anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub mode: ModeArgs,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ModeArgs {
    /// Restart the command whenever watched files change.
    #[command(visible_alias = "fs")]
    File(FileArgs),

    /// Re-run the command on a fixed interval.
    #[command(visible_alias = "cmd")]
    Command(TickArgs),
}

impl ModeArgs {
    pub fn command(&self) -> &[String] {
        match self {
            ModeArgs::File(a) => &a.command,
            ModeArgs::Command(a) => &a.command,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct FileArgs {
    /// Exclusion patterns (regular expressions, matched against paths
    /// relative to the watch root).
    #[arg(short = 'e', long, value_name = "PATTERN", value_delimiter = ',')]
    pub exclusions: Option<Vec<String>>,

    /// Inclusion patterns; a directory matching one is watched even if excluded.
    #[arg(short = 'i', long, value_name = "PATTERN", value_delimiter = ',')]
    pub inclusions: Option<Vec<String>>,

    /// Allowed file extensions, dot included (e.g. `.go`).
    #[arg(short = 's', long, value_name = "EXT", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Quiet period before a burst of changes triggers a restart.
    #[arg(short = 'd', long, value_name = "DURATION", value_parser = parse_positive_duration)]
    pub delay: Option<Duration>,

    /// Directory to watch (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// The command to supervise, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TickArgs {
    /// Period between runs.
    #[arg(
        short = 'd',
        long,
        visible_alias = "duration",
        value_name = "DURATION",
        value_parser = parse_positive_duration
    )]
    pub interval: Option<Duration>,

    /// Clear the terminal before each run.
    #[arg(long)]
    pub clear: bool,

    /// The command to run, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
