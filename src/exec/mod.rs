// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`group`] spawns the command as a new process group and kills/reaps it.
//! - [`supervisor`] owns the single current group and the [`Supervise`] seam
//!   the loop drivers talk to.
//! - [`reaper`] collects zombie descendants in the background.
//! - [`sink`] is the shared, colour-tinted output writer.
//! - [`env`] builds the per-start environment from env files.

pub mod env;
pub mod group;
pub mod reaper;
pub mod sink;
pub mod supervisor;

pub use env::Environment;
pub use group::{ChildGroup, CommandSpec};
pub use reaper::{ReapOutcome, ZombieReaper};
pub use sink::OutputSink;
pub use supervisor::{ProcessSupervisor, Supervise, SuperviseFuture};
