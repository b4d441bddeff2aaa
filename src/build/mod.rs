// src/build/mod.rs

//! Build execution layer.
//!
//! - [`command`] runs one [`BuildJob`] through the platform shell and turns
//!   whatever happens into a [`BuildResult`]. It never returns an error.
//! - [`builder_loop`] owns a background task that runs jobs strictly one
//!   after another and reports each result to the runtime.
//! - [`backend`] provides the [`BuildBackend`] trait the runtime talks to,
//!   and the production [`RealBuildBackend`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::errors::HotrunError;

pub mod backend;
pub mod builder_loop;
pub mod command;

pub use backend::{BuildBackend, RealBuildBackend};
pub use builder_loop::spawn_builder;
pub use command::run_build;

/// One invocation of the build command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub started_at: Instant,
    pub command: String,
    pub working_dir: PathBuf,
}

impl BuildJob {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            started_at: Instant::now(),
            command: command.into(),
            working_dir: working_dir.into(),
        }
    }
}

/// Why a build produced nothing runnable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildFailure {
    /// The command ran and exited non-zero (`-1` when killed by a signal).
    ExitStatus(i32),
    /// The command could not be started at all (missing shell/toolchain).
    Spawn(String),
    /// The command succeeded but the artifact is not where it should be.
    ArtifactMissing(PathBuf),
    /// Reading the command's output or waiting on it failed.
    Io(String),
}

impl std::fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildFailure::ExitStatus(code) => write!(f, "build command exited with {code}"),
            BuildFailure::Spawn(reason) => write!(f, "could not start build command: {reason}"),
            BuildFailure::ArtifactMissing(path) => {
                write!(f, "build succeeded but {} was not produced", path.display())
            }
            BuildFailure::Io(reason) => write!(f, "I/O error while building: {reason}"),
        }
    }
}

/// Outcome of a [`BuildJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub success: bool,
    /// Set only on success.
    pub artifact_path: Option<PathBuf>,
    /// Combined stdout and stderr of the build command.
    pub compiler_output: String,
    pub duration: Duration,
    /// Set only on failure.
    pub failure: Option<BuildFailure>,
}

impl BuildResult {
    pub fn succeeded(artifact: impl Into<PathBuf>, output: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: true,
            artifact_path: Some(artifact.into()),
            compiler_output: output.into(),
            duration,
            failure: None,
        }
    }

    pub fn failed(failure: BuildFailure, output: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            artifact_path: None,
            compiler_output: output.into(),
            duration,
            failure: Some(failure),
        }
    }

    /// The failure as a crate error, for logging.
    pub fn to_error(&self) -> Option<HotrunError> {
        self.failure
            .as_ref()
            .map(|f| HotrunError::Build(f.to_string()))
    }
}
