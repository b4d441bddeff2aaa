// src/supervisor/state.rs

//! The supervisor state machine.
//!
//! ```text
//! Idle/Failed --build ok--> Starting --launched--> Running
//! Running --build ok--> Stopping --exit confirmed--> Starting --> Running
//! Running --build failed--> Running   (old process untouched)
//! Idle --build failed--> Idle
//! Starting --launch error--> Failed
//! any --shutdown--> Stopping --> Idle
//! ```
//!
//! The current child is owned here and never handed out. A replacement is
//! only launched after the previous child's exit has been observed.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::build::BuildResult;
use crate::errors::HotrunError;
use crate::supervisor::output::{OutputSink, StreamKind};
use crate::supervisor::process::{ChildProcess, ProcessLauncher};
use crate::types::ExitInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Nothing running and nothing has gone wrong yet.
    Idle,
    /// A build is in flight and no process is running.
    Building,
    Starting,
    Running,
    Stopping,
    /// No process running because the last launch failed or the program
    /// died on its own.
    Failed,
}

/// How stopping the current process went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    /// Exited within the grace period.
    Exited(ExitInfo),
    /// Had to be killed.
    Killed(ExitInfo),
}

/// The single live instance of the program.
struct ManagedProcess {
    pid: Option<u32>,
    artifact_path: PathBuf,
    started_at: Instant,
    child: Box<dyn ChildProcess>,
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("pid", &self.pid)
            .field("artifact_path", &self.artifact_path)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

pub struct Supervisor<L: ProcessLauncher> {
    launcher: L,
    sink: Arc<dyn OutputSink>,
    grace_period: Duration,
    state: SupervisorState,
    current: Option<ManagedProcess>,
    ever_started: bool,
}

impl<L: ProcessLauncher> std::fmt::Debug for Supervisor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("state", &self.state)
            .field("current", &self.current)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher> Supervisor<L> {
    pub fn new(launcher: L, sink: Arc<dyn OutputSink>, grace_period: Duration) -> Self {
        Self {
            launcher,
            sink,
            grace_period,
            state: SupervisorState::Idle,
            current: None,
            ever_started: false,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn has_process(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_pid(&self) -> Option<u32> {
        self.current.as_ref().and_then(|p| p.pid)
    }

    pub fn current_artifact(&self) -> Option<&Path> {
        self.current.as_ref().map(|p| p.artifact_path.as_path())
    }

    /// A build has started. A running process keeps running meanwhile.
    pub fn begin_build(&mut self) {
        if self.current.is_none() {
            self.transition(SupervisorState::Building);
        }
    }

    /// React to a finished build.
    ///
    /// A failure is reported and leaves any running process alone. A
    /// success replaces the running process (stop, confirm exit, launch).
    pub async fn apply(&mut self, result: BuildResult) -> SupervisorState {
        let artifact = match (&result.artifact_path, result.success) {
            (Some(artifact), true) => artifact.clone(),
            _ => {
                self.report_build_failure(&result);
                return self.state;
            }
        };

        // Warnings.
        for line in result.compiler_output.lines() {
            self.sink.line(StreamKind::Stderr, line);
        }

        if self.current.is_some() {
            let outcome = self.stop_current().await;
            debug!(?outcome, "previous process stopped");
        }
        self.start(&artifact);
        self.state
    }

    /// Stop whatever is running and settle in `Idle`.
    pub async fn shutdown(&mut self) -> StopOutcome {
        let outcome = self.stop_current().await;
        self.transition(SupervisorState::Idle);
        outcome
    }

    /// Resolve when the current process exits on its own. Never resolves
    /// when nothing is running.
    ///
    /// Cancel safe; pair with [`Supervisor::on_exited`].
    pub fn wait_current(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = io::Result<ExitInfo>> + Send + '_>> {
        match self.current.as_mut() {
            Some(process) => process.child.wait(),
            None => Box::pin(std::future::pending()),
        }
    }

    /// Record that the current process exited without being asked to.
    pub fn on_exited(&mut self, exit: io::Result<ExitInfo>) {
        let Some(process) = self.current.take() else {
            return;
        };
        let uptime = process.started_at.elapsed();

        match exit {
            Ok(exit) if exit.success() => {
                info!(pid = process.pid, ?uptime, "process exited");
                self.transition(SupervisorState::Idle);
            }
            Ok(exit) => {
                warn!(pid = process.pid, ?uptime, status = %exit, "process exited unexpectedly");
                self.transition(SupervisorState::Failed);
            }
            Err(e) => {
                warn!(pid = process.pid, error = %e, "lost track of process");
                self.transition(SupervisorState::Failed);
            }
        }
    }

    fn start(&mut self, artifact: &Path) {
        self.transition(SupervisorState::Starting);

        match self.launcher.launch(artifact, Arc::clone(&self.sink)) {
            Ok(child) => {
                let pid = child.pid();
                self.current = Some(ManagedProcess {
                    pid,
                    artifact_path: artifact.to_path_buf(),
                    started_at: Instant::now(),
                    child,
                });
                self.ever_started = true;
                self.transition(SupervisorState::Running);
                info!(pid, "running {}", artifact.display());
            }
            Err(e) => {
                let err = HotrunError::Launch {
                    artifact: artifact.to_path_buf(),
                    reason: e.to_string(),
                };
                error!(error = %err, "waiting for the next change to retry");
                self.transition(SupervisorState::Failed);
            }
        }
    }

    /// Interrupt, wait up to the grace period, then kill. Only returns once
    /// the exit has been observed.
    async fn stop_current(&mut self) -> StopOutcome {
        let Some(mut process) = self.current.take() else {
            return StopOutcome::NotRunning;
        };
        self.transition(SupervisorState::Stopping);
        info!(pid = process.pid, "stopping process");

        if let Err(e) = process.child.graceful_stop() {
            debug!(pid = process.pid, error = %e, "interrupt failed; waiting anyway");
        }

        match tokio::time::timeout(self.grace_period, process.child.wait()).await {
            Ok(Ok(exit)) => {
                debug!(pid = process.pid, status = %exit, "process exited after interrupt");
                StopOutcome::Exited(exit)
            }
            Ok(Err(e)) => {
                warn!(pid = process.pid, error = %e, "waiting for process failed; killing it");
                Self::kill_and_reap(&mut process).await
            }
            Err(_) => {
                let err = HotrunError::ShutdownTimeout {
                    pid: process.pid.unwrap_or_default(),
                    grace: self.grace_period,
                };
                warn!(error = %err, "grace period exceeded");
                Self::kill_and_reap(&mut process).await
            }
        }
    }

    async fn kill_and_reap(process: &mut ManagedProcess) -> StopOutcome {
        if let Err(e) = process.child.force_kill() {
            error!(pid = process.pid, error = %e, "force kill failed");
        }
        match process.child.wait().await {
            Ok(exit) => StopOutcome::Killed(exit),
            Err(e) => {
                error!(pid = process.pid, error = %e, "could not confirm exit after kill");
                StopOutcome::Killed(ExitInfo::default())
            }
        }
    }

    fn report_build_failure(&mut self, result: &BuildResult) {
        let err = result
            .to_error()
            .unwrap_or_else(|| HotrunError::Build("build reported no artifact".to_string()));

        if self.current.is_some() {
            error!(error = %err, duration = ?result.duration, "build failed; previous version keeps running");
            self.transition(SupervisorState::Running);
        } else {
            error!(error = %err, duration = ?result.duration, "build failed");
            self.transition(if self.ever_started {
                SupervisorState::Failed
            } else {
                SupervisorState::Idle
            });
        }

        for line in result.compiler_output.lines() {
            self.sink.line(StreamKind::Stderr, line);
        }
    }

    fn transition(&mut self, next: SupervisorState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "supervisor state");
            self.state = next;
        }
    }
}
