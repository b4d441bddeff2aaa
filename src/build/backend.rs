// src/build/backend.rs

//! Pluggable build backend abstraction.
//!
//! The runtime asks a `BuildBackend` to start a build and later receives a
//! `RuntimeEvent::BuildFinished` on its event channel. Tests substitute a
//! backend that answers with scripted results instead of running a compiler.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::build::builder_loop::spawn_builder;
use crate::build::BuildJob;
use crate::config::BuildSettings;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};

/// Trait abstracting how builds are run.
pub trait BuildBackend: Send {
    /// Start one build. Completion is reported asynchronously as
    /// `RuntimeEvent::BuildFinished`.
    fn start_build(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: forwards jobs to the loop from [`spawn_builder`].
pub struct RealBuildBackend {
    settings: BuildSettings,
    tx: mpsc::Sender<BuildJob>,
}

impl RealBuildBackend {
    /// Spawns the background build loop immediately.
    pub fn new(settings: BuildSettings, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_builder(settings.artifact.clone(), runtime_tx);
        Self { settings, tx }
    }
}

impl BuildBackend for RealBuildBackend {
    fn start_build(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let job = BuildJob::new(self.settings.command.clone(), self.settings.working_dir.clone());
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(job).await.map_err(Error::from)?;
            Ok(())
        })
    }
}
