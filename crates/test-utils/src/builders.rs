#![allow(dead_code)]

use respawn::watch::PathFilter;

/// Builder for `PathFilter` to simplify test setup.
///
/// Starts with no rules at all: nothing excluded, nothing included, no
/// extension actionable.
#[derive(Debug, Default)]
pub struct PathFilterBuilder {
    exclusions: Vec<String>,
    inclusions: Vec<String>,
    extensions: Vec<String>,
}

impl PathFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(mut self, rule: &str) -> Self {
        self.exclusions.push(rule.to_string());
        self
    }

    pub fn include(mut self, rule: &str) -> Self {
        self.inclusions.push(rule.to_string());
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.extensions.push(ext.to_string());
        self
    }

    pub fn build(self) -> PathFilter {
        PathFilter::from_rules(&self.exclusions, &self.inclusions, &self.extensions)
            .expect("Failed to build a valid filter from builder")
    }
}
