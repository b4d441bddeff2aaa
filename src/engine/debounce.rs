// src/engine/debounce.rs

//! Coalescing bursts of relevant changes into a single rebuild trigger.
//!
//! The debouncer holds at most one pending deadline. Every relevant event
//! pushes it to `now + quiet`; once a caller observes the deadline passing,
//! exactly one trigger comes out, however many events fed the burst.
//!
//! Time is passed in explicitly so the logic stays pure; the async runtime
//! sleeps until [`Debouncer::deadline`] and then calls [`Debouncer::fire`].

use std::time::{Duration, Instant};

/// Quiet window between the last relevant event and the rebuild.
pub const QUIET_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
    /// Events folded into the pending trigger.
    pending_events: usize,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            pending_events: 0,
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Note a relevant event observed at `now`, (re)arming the timer.
    pub fn record(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
        self.pending_events += 1;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// If the quiet window has elapsed by `now`, disarm and return the number
    /// of events the trigger stands for.
    pub fn fire(&mut self, now: Instant) -> Option<usize> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(std::mem::take(&mut self.pending_events))
            }
            _ => None,
        }
    }

    /// Drop any pending trigger.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending_events = 0;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(QUIET_WINDOW)
    }
}
