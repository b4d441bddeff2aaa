// src/engine/mod.rs

//! Orchestration engine for hotrun.
//!
//! This module ties together:
//! - the path classifier (which changes matter)
//! - the debouncer (how bursts collapse into one rebuild)
//! - single-flight build bookkeeping ("one more rebuild owed")
//! - the main runtime event loop that reacts to:
//!   - file-watch events
//!   - build completion events
//!   - the running program exiting on its own
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::build::BuildResult;
use crate::types::ChangeEvent;

/// Why a rebuild was requested outside the debounce path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Initial build at startup.
    Startup,
}

/// Events flowing into the runtime from the watcher, the builder, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A raw filesystem notification; not yet classified.
    FileChanged(ChangeEvent),
    /// Build now, skipping the quiet window.
    RebuildRequested { reason: TriggerReason },
    /// The in-flight build finished.
    BuildFinished(BuildResult),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod debounce;
pub mod event_handlers;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use debounce::{Debouncer, QUIET_WINDOW};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
