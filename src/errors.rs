// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only configuration problems and a failure to watch the project root are
//! fatal. The remaining variants describe failures the supervisor logs and
//! then keeps going.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HotrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A directory could not be registered with the OS watcher.
    #[error("cannot watch {}: {reason}", path.display())]
    WatchSetup { path: PathBuf, reason: String },

    /// The build command exited non-zero or could not run.
    #[error("build failed: {0}")]
    Build(String),

    /// A freshly built artifact could not be started.
    #[error("cannot launch {}: {reason}", artifact.display())]
    Launch { artifact: PathBuf, reason: String },

    /// The child ignored the interrupt for the whole grace period.
    #[error("process {pid} still alive after {grace:?}; killed")]
    ShutdownTimeout { pid: u32, grace: Duration },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HotrunError {
    pub fn watch_setup(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        HotrunError::WatchSetup {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HotrunError>;
