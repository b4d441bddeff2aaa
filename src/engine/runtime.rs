// src/engine/runtime.rs

use std::fmt;
use std::io;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::build::BuildBackend;
use crate::errors::Result;
use crate::supervisor::{ProcessLauncher, Supervisor};
use crate::types::ExitInfo;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// What woke the loop up.
enum Wakeup {
    Event(RuntimeEvent),
    QuietWindow,
    ProcessExited(io::Result<ExitInfo>),
    ChannelClosed,
}

/// Drives the pipeline in response to `RuntimeEvent`s, delegating builds
/// to a `BuildBackend` and the program's lifecycle to a `Supervisor`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// rebuild semantics. This struct handles async IO: reading events from
/// the channel, sleeping until the debounce deadline, and noticing when the
/// program exits on its own.
pub struct Runtime<B: BuildBackend, L: ProcessLauncher> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    builder: B,
    supervisor: Supervisor<L>,
}

impl<B: BuildBackend, L: ProcessLauncher> fmt::Debug for Runtime<B, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

impl<B: BuildBackend, L: ProcessLauncher> Runtime<B, L> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        builder: B,
        supervisor: Supervisor<L>,
    ) -> Self {
        Self {
            core,
            event_rx,
            builder,
            supervisor,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime, along with debounce timeouts.
    /// - Executes commands returned by the core (build, apply, stop).
    ///
    /// Returns once shutdown has completed and the program is stopped.
    pub async fn run(mut self) -> Result<()> {
        info!("hotrun runtime started");

        loop {
            let deadline = self.core.debounce_deadline();

            let wakeup = tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => Wakeup::Event(event),
                    None => Wakeup::ChannelClosed,
                },
                _ = sleep_until(deadline) => Wakeup::QuietWindow,
                exit = self.supervisor.wait_current() => Wakeup::ProcessExited(exit),
            };

            let step = match wakeup {
                Wakeup::Event(event) => {
                    debug!(?event, "runtime received event");
                    self.core.step(event, Instant::now())
                }
                Wakeup::QuietWindow => self.core.quiet_window_elapsed(Instant::now()),
                Wakeup::ProcessExited(exit) => {
                    self.supervisor.on_exited(exit);
                    CoreStep::idle()
                }
                Wakeup::ChannelClosed => {
                    info!("runtime event channel closed; stopping");
                    CoreStep::stop(vec![CoreCommand::StopProcess])
                }
            };

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartBuild => {
                self.supervisor.begin_build();
                if let Err(e) = self.builder.start_build().await {
                    error!(error = %e, "could not start build; shutting down");
                    self.stop_program().await;
                    return Err(e);
                }
            }
            CoreCommand::ApplyBuild(result) => {
                let state = self.supervisor.apply(result).await;
                debug!(?state, "build applied");
            }
            CoreCommand::StopProcess => self.stop_program().await,
        }
        Ok(())
    }

    async fn stop_program(&mut self) {
        let outcome = self.supervisor.shutdown().await;
        info!(?outcome, "program stopped");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
