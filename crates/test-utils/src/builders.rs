#![allow(dead_code)]

use std::path::PathBuf;

use hotrun::config::{WatchConfig, DEFAULT_EXCLUDE_DIRS, DEFAULT_INCLUDE_EXTS};

/// Builder for `WatchConfig` to simplify test setup.
pub struct WatchConfigBuilder {
    root: PathBuf,
    exclude_dirs: Vec<String>,
    include_exts: Vec<String>,
}

impl WatchConfigBuilder {
    /// Starts from the built-in defaults.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            include_exts: DEFAULT_INCLUDE_EXTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn exclude(mut self, dir: &str) -> Self {
        self.exclude_dirs.push(dir.to_string());
        self
    }

    pub fn only_exts(mut self, exts: &[&str]) -> Self {
        self.include_exts = exts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> WatchConfig {
        WatchConfig::new(self.root, self.exclude_dirs, self.include_exts)
    }
}
