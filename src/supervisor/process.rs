// src/supervisor/process.rs

//! Process capability interface and its tokio implementation.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::supervisor::output::{OutputSink, StreamKind};
use crate::types::ExitInfo;

/// Upper bound on waiting for the output pumps after the child exited.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Something that can start the built program.
pub trait ProcessLauncher: Send {
    /// Start `artifact` with its streams forwarded to `sink`.
    fn launch(
        &mut self,
        artifact: &Path,
        sink: Arc<dyn OutputSink>,
    ) -> io::Result<Box<dyn ChildProcess>>;
}

/// A started child process.
pub trait ChildProcess: Send {
    fn pid(&self) -> Option<u32>;

    /// Ask the process to exit (SIGINT on unix).
    fn graceful_stop(&mut self) -> io::Result<()>;

    /// Kill the process unconditionally.
    fn force_kill(&mut self) -> io::Result<()>;

    /// Wait for the process to exit and its output to be flushed.
    ///
    /// Must be cancel safe: dropping the future early and calling `wait`
    /// again is allowed.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitInfo>> + Send + '_>>;
}

/// Launches artifacts with `tokio::process`.
///
/// On unix the child gets its own process group, so signals reach any
/// helpers it spawns and the terminal's Ctrl-C reaches only `hotrun`.
#[derive(Debug, Clone)]
pub struct TokioLauncher {
    args: Vec<String>,
    working_dir: PathBuf,
}

impl TokioLauncher {
    pub fn new(args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            args,
            working_dir: working_dir.into(),
        }
    }
}

impl ProcessLauncher for TokioLauncher {
    fn launch(
        &mut self,
        artifact: &Path,
        sink: Arc<dyn OutputSink>,
    ) -> io::Result<Box<dyn ChildProcess>> {
        let mut cmd = Command::new(artifact);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let pid = child.id();
        info!(pid, artifact = %artifact.display(), "process launched");

        let pumps = [
            pump(child.stdout.take(), StreamKind::Stdout, Arc::clone(&sink)),
            pump(child.stderr.take(), StreamKind::Stderr, sink),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok(Box::new(TokioChild {
            child,
            pid,
            pumps,
            reaped: false,
        }))
    }
}

/// Forward a child stream line by line. Invalid UTF-8 is replaced rather
/// than ending the pump, which would leave the pipe to fill up.
fn pump<R>(reader: Option<R>, stream: StreamKind, sink: Arc<dyn OutputSink>) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let reader = reader?;
    Some(tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    sink.line(stream, line.trim_end_matches(['\n', '\r']));
                }
                Err(e) => {
                    debug!(?stream, error = %e, "output pump stopped");
                    break;
                }
            }
        }
    }))
}

struct TokioChild {
    child: Child,
    pid: Option<u32>,
    pumps: Vec<JoinHandle<()>>,
    /// Set once `wait` has collected the exit status; the pid may be reused
    /// from then on and must not be signalled.
    reaped: bool,
}

impl TokioChild {
    #[cfg(unix)]
    fn signal_group(&self, signal: nix::sys::signal::Signal) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        let Some(pid) = self.pid.filter(|_| !self.reaped) else {
            return Ok(());
        };
        match killpg(Pid::from_raw(pid as i32), signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::from(e)),
        }
    }
}

impl ChildProcess for TokioChild {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn graceful_stop(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            self.signal_group(nix::sys::signal::Signal::SIGINT)
        }
        #[cfg(not(unix))]
        {
            self.child.start_kill()
        }
    }

    fn force_kill(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        self.signal_group(nix::sys::signal::Signal::SIGKILL)?;

        match self.child.start_kill() {
            Ok(()) => Ok(()),
            // Exited already; nothing left to kill.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitInfo>> + Send + '_>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            self.reaped = true;

            let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
            while let Some(handle) = self.pumps.pop() {
                if tokio::time::timeout_at(deadline, handle).await.is_err() {
                    debug!(pid = self.pid, "output pump still busy after exit; detaching");
                }
            }

            Ok(ExitInfo::from(status))
        })
    }
}
