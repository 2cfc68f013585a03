// src/engine/mod.rs

//! Top-level drivers.
//!
//! - [`watch_loop`] reacts to filesystem notifications (file mode).
//! - [`tick_loop`] restarts on a fixed period (command mode).
//! - [`shutdown`] turns operator signals into a shared cancellation token.
//!
//! Both loops receive the token explicitly and, when it fires, return only
//! after the supervisor has killed and reaped the current child.

pub mod shutdown;
pub mod tick_loop;
pub mod watch_loop;

pub use shutdown::spawn_signal_listener;
pub use tick_loop::TickLoop;
pub use watch_loop::WatchLoop;
