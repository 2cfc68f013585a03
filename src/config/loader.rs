// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{RespawnError, Result};

/// Name of the config file picked up from the cwd when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "Respawn.toml";

/// Load and deserialize a configuration file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        RespawnError::Config(format!("cannot read config file {}: {e}", path.display()))
    })?;

    let config: ConfigFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Resolve the config the CLI asked for.
///
/// - An explicit path must exist.
/// - Without one, `Respawn.toml` in the cwd is used when present.
/// - Otherwise every setting falls back to its default.
pub fn load_for_cli(explicit: Option<&Path>) -> Result<ConfigFile> {
    match explicit {
        Some(path) => load_from_path(path),
        None => {
            let default = default_config_path();
            if default.is_file() {
                load_from_path(&default)
            } else {
                Ok(ConfigFile::default())
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
