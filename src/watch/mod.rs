// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the exclusion / inclusion / extension rules ([`filter`]).
//! - Subscribing every admitted directory with `notify` and classifying the
//!   events it delivers ([`tree`]).
//! - Coalescing bursts of qualifying changes ([`debounce`]).
//!
//! It does **not** know about processes; the watch loop in `engine` turns
//! debounced triggers into supervisor restarts.

pub mod debounce;
pub mod filter;
pub mod path_utils;
pub mod tree;

pub use debounce::Debouncer;
pub use filter::{Matcher, PathFilter};
pub use tree::{Disposition, NotifyEvents, NotifyRegistry, TreeWatcher, WatchRegistry};
