// src/watch/filter.rs

//! Directory admission and file actionability rules.
//!
//! Three independent matchers drive every decision the watcher makes:
//!
//! - `exclude`: paths (relative to the watch root) that should be ignored,
//! - `include`: paths that are watched even when `exclude` matches,
//! - `extension`: allowed file extensions (e.g. `.go`).
//!
//! All matching is case-insensitive, which is the same as matching lowercase
//! paths against lowercase rules.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::errors::{RespawnError, Result};

/// A compiled rule set. An empty rule set matches nothing.
#[derive(Clone, Default)]
pub struct Matcher {
    regex: Option<Regex>,
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.regex {
            Some(re) => f.debug_tuple("Matcher").field(&re.as_str()).finish(),
            None => f.write_str("Matcher(<empty>)"),
        }
    }
}

impl Matcher {
    /// Matcher that never matches.
    pub fn none() -> Self {
        Self { regex: None }
    }

    /// Compile rules into an unanchored alternation, `(a|b|c)`.
    ///
    /// Entries may themselves be comma-separated lists.
    pub fn unanchored(kind: &'static str, rules: &[String]) -> Result<Self> {
        Self::compile(kind, rules, false)
    }

    /// Compile rules into an anchored alternation, `^(a|b|c)$`.
    pub fn anchored(kind: &'static str, rules: &[String]) -> Result<Self> {
        Self::compile(kind, rules, true)
    }

    fn compile(kind: &'static str, rules: &[String], anchored: bool) -> Result<Self> {
        let Some(joined) = join_rules(rules) else {
            return Ok(Self::none());
        };
        let raw = if anchored {
            format!("^({joined})$")
        } else {
            format!("({joined})")
        };
        let regex = RegexBuilder::new(&raw)
            .case_insensitive(true)
            .build()
            .map_err(|source| RespawnError::Pattern { kind, source })?;
        tracing::debug!(rules = %raw, "compiled {kind} rules");
        Ok(Self { regex: Some(regex) })
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(s))
    }

    /// The compiled pattern, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }
}

/// Join rule entries with `|`, treating commas as separators too.
///
/// Returns `None` when no non-empty entry remains.
fn join_rules(rules: &[String]) -> Option<String> {
    let parts: Vec<&str> = rules
        .iter()
        .flat_map(|r| r.split(','))
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

/// The predicate set the tree watcher consults.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    exclude: Matcher,
    include: Matcher,
    extension: Matcher,
}

impl PathFilter {
    pub fn new(exclude: Matcher, include: Matcher, extension: Matcher) -> Self {
        Self {
            exclude,
            include,
            extension,
        }
    }

    /// Compile the three rule lists the way the CLI and config file supply them.
    pub fn from_rules(
        exclusions: &[String],
        inclusions: &[String],
        extensions: &[String],
    ) -> Result<Self> {
        Ok(Self::new(
            Matcher::unanchored("exclusion", exclusions)?,
            Matcher::unanchored("inclusion", inclusions)?,
            Matcher::anchored("extension", extensions)?,
        ))
    }

    /// Whether a directory should be subscribed: `included || !excluded`.
    ///
    /// `key` is the lowercase path relative to the watch root.
    pub fn admits_directory(&self, key: &str) -> bool {
        self.include.is_match(key) || !self.exclude.is_match(key)
    }

    /// Whether a change to a file should trigger a restart:
    /// `extension matches && !excluded`.
    ///
    /// `ext` is the lowercase extension including the dot (`""` if none).
    pub fn is_actionable(&self, key: &str, ext: &str) -> bool {
        self.extension.is_match(ext) && !self.exclude.is_match(key)
    }
}
