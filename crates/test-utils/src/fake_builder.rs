use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use hotrun::build::{BuildBackend, BuildFailure, BuildResult};
use hotrun::engine::RuntimeEvent;
use hotrun::errors::{HotrunError, Result};

/// Counters shared between a [`FakeBuildBackend`] and the test.
#[derive(Debug, Default)]
pub struct BuildStats {
    started: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl BuildStats {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// A fake build backend that:
/// - counts builds and how many overlapped
/// - answers each build after `duration` with the next scripted result
///   (a success for `artifact` once the script runs out).
pub struct FakeBuildBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    artifact: PathBuf,
    duration: Duration,
    script: Arc<Mutex<VecDeque<bool>>>,
    stats: Arc<BuildStats>,
    start_limit: Option<usize>,
}

impl FakeBuildBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            runtime_tx,
            artifact: artifact.into(),
            duration: Duration::from_millis(20),
            script: Arc::new(Mutex::new(VecDeque::new())),
            stats: Arc::new(BuildStats::default()),
            start_limit: None,
        }
    }

    /// Fail to even start any build after the first `builds`.
    pub fn refusing_after(mut self, builds: usize) -> Self {
        self.start_limit = Some(builds);
        self
    }

    /// How long each fake build takes.
    pub fn taking(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Queue outcomes for the next builds, `true` meaning success.
    pub fn with_outcomes(self, outcomes: &[bool]) -> Self {
        self.script.lock().unwrap().extend(outcomes.iter().copied());
        self
    }

    /// Handle for adding outcomes after the backend moved into a runtime.
    pub fn script(&self) -> Arc<Mutex<VecDeque<bool>>> {
        Arc::clone(&self.script)
    }

    pub fn stats(&self) -> Arc<BuildStats> {
        Arc::clone(&self.stats)
    }
}

impl BuildBackend for FakeBuildBackend {
    fn start_build(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        if self
            .start_limit
            .is_some_and(|limit| self.stats.started() >= limit)
        {
            return Box::pin(async { Err(HotrunError::Build("build queue closed".into())) });
        }

        let tx = self.runtime_tx.clone();
        let stats = Arc::clone(&self.stats);
        let success = self.script.lock().unwrap().pop_front().unwrap_or(true);
        let artifact = self.artifact.clone();
        let duration = self.duration;

        stats.started.fetch_add(1, Ordering::SeqCst);
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        Box::pin(async move {
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                let result = if success {
                    BuildResult::succeeded(artifact, "", duration)
                } else {
                    BuildResult::failed(
                        BuildFailure::ExitStatus(1),
                        "./main.go:3:1: syntax error: non-declaration statement outside function body",
                        duration,
                    )
                };
                stats.in_flight.fetch_sub(1, Ordering::SeqCst);
                let _ = tx.send(RuntimeEvent::BuildFinished(result)).await;
            });
            Ok(())
        })
    }
}
