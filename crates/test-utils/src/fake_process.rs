use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use hotrun::supervisor::{ChildProcess, OutputSink, ProcessLauncher, StreamKind};
use hotrun::types::ExitInfo;

const SIGINT: i32 = 2;
const SIGKILL: i32 = 9;

/// What happened to the fake processes, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Launched { id: usize, artifact: PathBuf },
    Interrupted { id: usize },
    Killed { id: usize },
    Exited { id: usize, exit: ExitInfo },
}

/// Shared record of everything a [`FakeLauncher`] did.
#[derive(Debug, Default)]
pub struct ProcessStats {
    events: Mutex<Vec<LifecycleEvent>>,
    alive: AtomicUsize,
    max_alive: AtomicUsize,
}

impl ProcessStats {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn launches(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Launched { .. }))
            .count()
    }

    pub fn kills(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Killed { .. }))
            .count()
    }

    /// Processes launched and not yet confirmed exited.
    pub fn alive(&self) -> usize {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn max_alive(&self) -> usize {
        self.max_alive.load(Ordering::SeqCst)
    }

    fn push(&self, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A fake launcher whose children:
/// - exit on interrupt, unless `ignoring_interrupt` is set
/// - always exit on kill
/// - optionally exit by themselves after a delay
pub struct FakeLauncher {
    stats: Arc<ProcessStats>,
    next_id: usize,
    ignores_interrupt: bool,
    fail_launches: usize,
    exit_after: Option<(Duration, i32)>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(ProcessStats::default()),
            next_id: 0,
            ignores_interrupt: false,
            fail_launches: 0,
            exit_after: None,
        }
    }

    pub fn ignoring_interrupt(mut self) -> Self {
        self.ignores_interrupt = true;
        self
    }

    /// Fail the next `n` launches with `NotFound`.
    pub fn failing_launches(mut self, n: usize) -> Self {
        self.fail_launches = n;
        self
    }

    /// Children exit with `code` after `delay` on their own.
    pub fn exiting_after(mut self, delay: Duration, code: i32) -> Self {
        self.exit_after = Some((delay, code));
        self
    }

    pub fn stats(&self) -> Arc<ProcessStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(
        &mut self,
        artifact: &Path,
        sink: Arc<dyn OutputSink>,
    ) -> io::Result<Box<dyn ChildProcess>> {
        if self.fail_launches > 0 {
            self.fail_launches -= 1;
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }

        let id = self.next_id;
        self.next_id += 1;

        let alive = self.stats.alive.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_alive.fetch_max(alive, Ordering::SeqCst);
        self.stats.push(LifecycleEvent::Launched {
            id,
            artifact: artifact.to_path_buf(),
        });
        sink.line(StreamKind::Stdout, &format!("fake process {id} started"));

        let (exit_tx, exit_rx) = watch::channel(None);
        let exit_tx = Arc::new(exit_tx);

        if let Some((delay, code)) = self.exit_after {
            let tx = Arc::clone(&exit_tx);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tx.send_if_modified(|v| set_once(v, ExitInfo::from_code(code)));
            });
        }

        Ok(Box::new(FakeChild {
            id,
            stats: Arc::clone(&self.stats),
            ignores_interrupt: self.ignores_interrupt,
            exit_tx,
            exit_rx,
            reaped: false,
        }))
    }
}

fn set_once(slot: &mut Option<ExitInfo>, exit: ExitInfo) -> bool {
    if slot.is_none() {
        *slot = Some(exit);
        true
    } else {
        false
    }
}

struct FakeChild {
    id: usize,
    stats: Arc<ProcessStats>,
    ignores_interrupt: bool,
    exit_tx: Arc<watch::Sender<Option<ExitInfo>>>,
    exit_rx: watch::Receiver<Option<ExitInfo>>,
    reaped: bool,
}

impl ChildProcess for FakeChild {
    fn pid(&self) -> Option<u32> {
        Some(10_000 + self.id as u32)
    }

    fn graceful_stop(&mut self) -> io::Result<()> {
        self.stats.push(LifecycleEvent::Interrupted { id: self.id });
        if !self.ignores_interrupt {
            self.exit_tx
                .send_if_modified(|v| set_once(v, ExitInfo::from_signal(SIGINT)));
        }
        Ok(())
    }

    fn force_kill(&mut self) -> io::Result<()> {
        self.stats.push(LifecycleEvent::Killed { id: self.id });
        self.exit_tx
            .send_if_modified(|v| set_once(v, ExitInfo::from_signal(SIGKILL)));
        Ok(())
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitInfo>> + Send + '_>> {
        Box::pin(async move {
            let exit = {
                let seen = self
                    .exit_rx
                    .wait_for(Option::is_some)
                    .await
                    .map_err(|e| io::Error::other(e.to_string()))?;
                (*seen).unwrap_or_default()
            };

            if !self.reaped {
                self.reaped = true;
                self.stats.alive.fetch_sub(1, Ordering::SeqCst);
                self.stats.push(LifecycleEvent::Exited { id: self.id, exit });
            }
            Ok(exit)
        })
    }
}

/// Output sink that keeps every line for assertions.
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<(StreamKind, String)>>,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(StreamKind, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn stderr_text(&self) -> String {
        self.lines()
            .into_iter()
            .filter(|(s, _)| *s == StreamKind::Stderr)
            .map(|(_, l)| l)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputSink for CaptureSink {
    fn line(&self, stream: StreamKind, line: &str) {
        self.lines.lock().unwrap().push((stream, line.to_string()));
    }
}
