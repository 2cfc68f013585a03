// src/config/mod.rs

pub mod duration;
pub mod loader;
pub mod model;
pub mod settings;

pub use loader::{DEFAULT_CONFIG_FILE, load_for_cli, load_from_path};
pub use model::{CommandSection, ConfigFile, EnvSection, FileSection};
pub use settings::{Mode, Settings, TickSettings, WatchSettings};
