// src/signals.rs

//! Process signals that end a session.
//!
//! Interrupt, terminate and hangup all lead to the same orderly shutdown.
//! The supervised program lives in its own process group, so a signal aimed
//! at `hotrun` never reaches it directly. Stopping it is the supervisor's
//! job, and that only happens if `hotrun` stays alive long enough.

use std::io;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::engine::RuntimeEvent;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Signal handlers, installed up front so nothing sent after
/// [`ShutdownSignals::install`] returns can kill the process outright.
#[derive(Debug)]
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(unix)]
    hangup: Signal,
}

impl ShutdownSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            interrupt: signal(SignalKind::interrupt())?,
            #[cfg(unix)]
            terminate: signal(SignalKind::terminate())?,
            #[cfg(unix)]
            hangup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next shutdown signal and return its name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }

    /// Wait for the next shutdown signal and return its name.
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "Ctrl+C"
    }
}

/// Turn the first shutdown signal into [`RuntimeEvent::ShutdownRequested`].
pub fn forward_shutdown(
    mut signals: ShutdownSignals,
    tx: mpsc::Sender<RuntimeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = signals.recv().await;
        info!(signal = name, "shutting down");
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::sys::signal::{raise, Signal as NixSignal};
    use std::time::Duration;

    #[tokio::test]
    async fn hangup_requests_shutdown() {
        let signals = ShutdownSignals::install().unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        let task = forward_shutdown(signals, tx);

        raise(NixSignal::SIGHUP).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(matches!(event, Some(RuntimeEvent::ShutdownRequested)));
        task.await.unwrap();
    }
}
