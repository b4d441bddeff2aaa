// src/build/builder_loop.rs

//! Background loop that runs build jobs one at a time.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::build::command::run_build;
use crate::build::BuildJob;
use crate::engine::RuntimeEvent;

/// Spawn the background build loop.
///
/// Jobs sent on the returned channel are run strictly in order: the next
/// job is not started until the previous one has finished and its
/// `RuntimeEvent::BuildFinished` has been delivered.
pub fn spawn_builder(
    artifact: PathBuf,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<BuildJob> {
    let (tx, mut rx) = mpsc::channel::<BuildJob>(4);

    tokio::spawn(async move {
        info!("build loop started");

        while let Some(job) = rx.recv().await {
            let result = run_build(&job, &artifact).await;
            debug!(success = result.success, duration = ?result.duration, "build finished");

            if runtime_tx
                .send(RuntimeEvent::BuildFinished(result))
                .await
                .is_err()
            {
                debug!("runtime gone; dropping build result");
                break;
            }
        }

        info!("build loop finished (channel closed)");
    });

    tx
}
