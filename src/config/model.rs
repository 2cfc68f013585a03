// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Optional configuration file, e.g. `Respawn.toml`:
///
/// ```toml
/// [file]
/// exclusions = [".git", "target"]
/// extensions = [".rs", ".toml"]
/// delay = "300ms"
///
/// [command]
/// interval = "2s"
/// clear = true
///
/// [env]
/// files = [".env"]
/// ```
///
/// Every key is optional; command-line flags win over the file, the file
/// wins over built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub file: FileSection,

    #[serde(default)]
    pub command: CommandSection,

    #[serde(default)]
    pub env: EnvSection,
}

/// `[file]` section: file-watch mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSection {
    pub exclusions: Option<Vec<String>>,
    pub inclusions: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
    /// Debounce quiet period, e.g. `"500ms"`.
    pub delay: Option<String>,
    /// Directory to watch; relative paths resolve against the cwd.
    pub root: Option<PathBuf>,
}

/// `[command]` section: fixed-interval mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSection {
    pub interval: Option<String>,
    pub clear: Option<bool>,
}

/// `[env]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvSection {
    pub files: Option<Vec<String>>,
}
