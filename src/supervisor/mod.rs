// src/supervisor/mod.rs

//! Lifecycle of the one running instance of the built program.
//!
//! The [`Supervisor`] is written purely against the capability traits in
//! [`process`] ({launch, graceful stop, force kill, wait}); the tokio-based
//! implementation with unix signal handling lives next to them. Child
//! output is forwarded through an [`OutputSink`].

use std::time::Duration;

pub mod output;
pub mod process;
pub mod state;

pub use output::{OutputSink, StdioSink, StreamKind};
pub use process::{ChildProcess, ProcessLauncher, TokioLauncher};
pub use state::{StopOutcome, Supervisor, SupervisorState};

/// How long a child gets to exit after the interrupt before it is killed.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);
