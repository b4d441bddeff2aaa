// src/config/model.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Directory names ignored unless configured otherwise.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[".git", ".idea", "tmp", "vendor"];

/// File extensions that trigger a rebuild unless configured otherwise.
pub const DEFAULT_INCLUDE_EXTS: &[&str] = &[
    "go", "html", "yaml", "yml", "toml", "ini", "json", "xml", "tpl", "tmpl",
];

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// root = "."
/// exclude_dirs = [".git", ".idea", "tmp", "vendor"]
/// include_exts = ["go", "html", "yaml"]
///
/// [build]
/// cmd = "go build -o tmp/main ./cmd/server"
/// artifact = "tmp/main"
///
/// [run]
/// args = ["-port", "8080"]
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub run: RunSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    #[serde(default = "default_include_exts")]
    pub include_exts: Vec<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_exclude_dirs() -> Vec<String> {
    DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect()
}

fn default_include_exts() -> Vec<String> {
    DEFAULT_INCLUDE_EXTS.iter().map(|s| s.to_string()).collect()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude_dirs: default_exclude_dirs(),
            include_exts: default_include_exts(),
        }
    }
}

/// `[build]` section.
///
/// When `cmd` is absent the command is derived from the discovered entry
/// point (see [`crate::config::discover`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    #[serde(default)]
    pub cmd: Option<String>,

    /// Where the build leaves the executable, relative to the root.
    #[serde(default = "default_artifact")]
    pub artifact: PathBuf,
}

pub(crate) fn default_artifact() -> PathBuf {
    PathBuf::from(format!("tmp/main{}", std::env::consts::EXE_SUFFIX))
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            cmd: None,
            artifact: default_artifact(),
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    #[serde(default)]
    pub args: Vec<String>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchConfig,
    pub build: BuildSection,
    pub run: RunSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(watch: WatchConfig, build: BuildSection, run: RunSection) -> Self {
        Self { watch, build, run }
    }
}

/// What to watch and which changes count.
///
/// Extensions are stored without a leading dot and compared
/// case-sensitively; directory names are matched against whole path
/// components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    root: PathBuf,
    exclude_dirs: BTreeSet<String>,
    include_exts: BTreeSet<String>,
}

impl WatchConfig {
    pub fn new<E, I>(root: impl Into<PathBuf>, exclude_dirs: E, include_exts: I) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            root: root.into(),
            exclude_dirs: exclude_dirs.into_iter().map(Into::into).collect(),
            include_exts: include_exts
                .into_iter()
                .map(|e| {
                    let e: String = e.into();
                    e.trim_start_matches('.').to_string()
                })
                .collect(),
        }
    }

    /// Defaults rooted at `root`.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        Self::new(
            root,
            DEFAULT_EXCLUDE_DIRS.iter().copied(),
            DEFAULT_INCLUDE_EXTS.iter().copied(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exclude_dirs(&self) -> &BTreeSet<String> {
        &self.exclude_dirs
    }

    pub fn include_exts(&self) -> &BTreeSet<String> {
        &self.include_exts
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.contains(name)
    }
}
