// src/config/mod.rs

//! Configuration: optional `Hotrun.toml`, CLI overrides, validation and
//! entry discovery.
//!
//! The result is immutable for the lifetime of the process: a
//! [`WatchConfig`] shared read-only by the watcher and the classifier, and a
//! [`BuildSettings`] owned by the build backend.

pub mod discover;
pub mod loader;
pub mod model;
pub mod validate;

pub use discover::{discover_entry, resolve_build_settings, BuildSettings};
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    BuildSection, ConfigFile, RawConfigFile, RunSection, WatchConfig, WatchSection,
    DEFAULT_EXCLUDE_DIRS, DEFAULT_INCLUDE_EXTS,
};
