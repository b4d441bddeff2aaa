// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sleeping until the debounce deadline
//! - running builds and driving the supervisor
//! - handling Ctrl+C / shutdown
//!
//! Time is an input: every call takes `now`, so the core can be unit tested
//! without any Tokio, channels, filesystem, or processes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::WatchConfig;
use crate::engine::debounce::Debouncer;
use crate::engine::event_handlers::{
    handle_build_finished, handle_file_changed, handle_quiet_window, handle_rebuild_requested,
    handle_shutdown, BuildSlot, CoreCommand, CoreStep,
};
use crate::engine::RuntimeEvent;
use crate::watch::PathClassifier;

/// Pure core runtime state.
///
/// This owns:
/// - the path classifier
/// - the debouncer
/// - the single-flight build slot
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    classifier: PathClassifier,
    debouncer: Debouncer,
    slot: BuildSlot,
    shutting_down: bool,
}

impl CoreRuntime {
    pub fn new(watch: Arc<WatchConfig>, quiet: Duration) -> Self {
        Self {
            classifier: PathClassifier::new(watch),
            debouncer: Debouncer::new(quiet),
            slot: BuildSlot::default(),
            shutting_down: false,
        }
    }

    /// When the shell should call [`CoreRuntime::quiet_window_elapsed`].
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn build_in_flight(&self) -> bool {
        self.slot.in_flight
    }

    pub fn rebuild_owed(&self) -> bool {
        self.slot.owed
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent, now: Instant) -> CoreStep {
        if self.shutting_down {
            return self.step_shutting_down(event);
        }

        match event {
            RuntimeEvent::FileChanged(change) => {
                handle_file_changed(&self.classifier, &mut self.debouncer, &change, now)
            }
            RuntimeEvent::RebuildRequested { reason } => {
                handle_rebuild_requested(&mut self.debouncer, &mut self.slot, reason)
            }
            RuntimeEvent::BuildFinished(result) => handle_build_finished(&mut self.slot, result),
            RuntimeEvent::ShutdownRequested => {
                self.shutting_down = true;
                handle_shutdown(&mut self.debouncer, &mut self.slot)
            }
        }
    }

    /// The debounce timer went off.
    pub fn quiet_window_elapsed(&mut self, now: Instant) -> CoreStep {
        if self.shutting_down {
            return CoreStep::idle();
        }
        handle_quiet_window(&mut self.debouncer, &mut self.slot, now)
    }

    /// Only the in-flight build matters now; its result is discarded.
    fn step_shutting_down(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::BuildFinished(_) => {
                self.slot = BuildSlot::default();
                CoreStep::stop(vec![CoreCommand::StopProcess])
            }
            other => {
                debug!(event = ?other, "ignoring event during shutdown");
                CoreStep::idle()
            }
        }
    }
}
