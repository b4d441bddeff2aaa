// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::time::Instant;

use tracing::{debug, info};

use crate::build::BuildResult;
use crate::engine::debounce::Debouncer;
use crate::engine::TriggerReason;
use crate::types::ChangeEvent;
use crate::watch::PathClassifier;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start one build. Never issued while another is in flight.
    StartBuild,
    /// Hand a finished build to the supervisor.
    ApplyBuild(BuildResult),
    /// Stop the running program for good (shutdown).
    StopProcess,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    pub(crate) fn run(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn stop(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Single-flight bookkeeping for builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSlot {
    pub in_flight: bool,
    /// At most one extra build waits behind the in-flight one.
    pub owed: bool,
}

impl BuildSlot {
    /// Either start a build now or remember that one is owed.
    pub fn request(&mut self) -> Option<CoreCommand> {
        if self.in_flight {
            if !self.owed {
                debug!("build in flight; one more rebuild owed");
            }
            self.owed = true;
            None
        } else {
            self.in_flight = true;
            Some(CoreCommand::StartBuild)
        }
    }

    /// The in-flight build is done. Returns the owed build, if any.
    pub fn finish(&mut self) -> Option<CoreCommand> {
        self.in_flight = false;
        if std::mem::take(&mut self.owed) {
            self.in_flight = true;
            Some(CoreCommand::StartBuild)
        } else {
            None
        }
    }
}

/// A raw change: classify and feed the debouncer.
pub fn handle_file_changed(
    classifier: &PathClassifier,
    debouncer: &mut Debouncer,
    change: &ChangeEvent,
    now: Instant,
) -> CoreStep {
    if change.kind.alters_content() && classifier.is_relevant(&change.path) {
        debug!(path = %change.path.display(), kind = ?change.kind, "relevant change");
        debouncer.record(now);
    }
    CoreStep::idle()
}

/// The debounce deadline may have passed.
pub fn handle_quiet_window(debouncer: &mut Debouncer, slot: &mut BuildSlot, now: Instant) -> CoreStep {
    match debouncer.fire(now) {
        Some(events) => {
            info!(events, "change detected; rebuilding");
            CoreStep::run(slot.request().into_iter().collect())
        }
        None => CoreStep::idle(),
    }
}

/// Explicit rebuild (startup), bypassing the quiet window.
pub fn handle_rebuild_requested(
    debouncer: &mut Debouncer,
    slot: &mut BuildSlot,
    reason: TriggerReason,
) -> CoreStep {
    debug!(?reason, "rebuild requested");
    // The explicit build covers anything pending.
    debouncer.cancel();
    CoreStep::run(slot.request().into_iter().collect())
}

/// A build finished: apply it and start the owed build, if any.
pub fn handle_build_finished(slot: &mut BuildSlot, result: BuildResult) -> CoreStep {
    let mut commands = vec![CoreCommand::ApplyBuild(result)];
    commands.extend(slot.finish());
    CoreStep::run(commands)
}

/// Shutdown: drop pending work, and stop the program unless a build still
/// has to finish first.
pub fn handle_shutdown(debouncer: &mut Debouncer, slot: &mut BuildSlot) -> CoreStep {
    debouncer.cancel();
    slot.owed = false;

    if slot.in_flight {
        info!("shutdown requested; waiting for the running build to finish");
        CoreStep::idle()
    } else {
        CoreStep::stop(vec![CoreCommand::StopProcess])
    }
}
