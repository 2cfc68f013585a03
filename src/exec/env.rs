// src/exec/env.rs

//! Environment snapshot for a child start.
//!
//! Env files are read fresh on every start so edits to `.env` take effect on
//! the next restart. Their key/value pairs are layered over the environment
//! the supervisor inherited.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::fs::FileSystem;

/// Override pairs applied on top of the inherited environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    overrides: Vec<(String, String)>,
}

impl Environment {
    /// Inherit the supervisor's environment unchanged.
    pub fn inherited() -> Self {
        Self::default()
    }

    /// Read `files` in order; later files override keys from earlier ones.
    pub fn capture(fs: &dyn FileSystem, files: &[PathBuf]) -> Result<Self> {
        let mut overrides: Vec<(String, String)> = Vec::new();
        for file in files {
            let contents = fs.read_to_string(file)?;
            let pairs = parse_env_file(&contents)
                .with_context(|| format!("parsing env file {:?}", file))?;
            for (key, value) in pairs {
                match overrides.iter_mut().find(|(k, _)| *k == key) {
                    Some(slot) => slot.1 = value,
                    None => overrides.push((key, value)),
                }
            }
        }
        Ok(Self { overrides })
    }

    pub fn overrides(&self) -> &[(String, String)] {
        &self.overrides
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Expand the `--env` values: `off` disables env files entirely, and a path
/// ending in `.` names the `.env` file of that directory.
pub fn resolve_env_files(values: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if value.eq_ignore_ascii_case("off") {
            return Vec::new();
        }
        if value == "." || value.ends_with("/.") {
            let dir = value.trim_end_matches('.').trim_end_matches('/');
            let dir = if dir.is_empty() { "." } else { dir };
            files.push(Path::new(dir).join(".env"));
        } else {
            files.push(PathBuf::from(value));
        }
    }
    files
}

/// Parse dotenv-formatted `contents` into ordered `KEY=VALUE` pairs.
///
/// `$VAR` references are expanded against earlier keys of the same file and
/// the inherited environment; nothing is written to the process environment.
pub fn parse_env_file(contents: &str) -> Result<Vec<(String, String)>> {
    dotenvy::from_read_iter(contents.as_bytes())
        .map(|item| item.map_err(|err| anyhow!("{err}")))
        .collect()
}
