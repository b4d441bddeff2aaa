// src/supervisor/output.rs

use std::io::Write;

/// Which of the child's standard streams a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Destination for the child's output and for build diagnostics.
pub trait OutputSink: Send + Sync + std::fmt::Debug {
    /// Emit one line (without its trailing newline).
    fn line(&self, stream: StreamKind, line: &str);
}

/// Writes to the tool's own stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioSink;

impl OutputSink for StdioSink {
    fn line(&self, stream: StreamKind, line: &str) {
        // Write errors (closed pipe) are ignored.
        let _ = match stream {
            StreamKind::Stdout => writeln!(std::io::stdout().lock(), "{line}"),
            StreamKind::Stderr => writeln!(std::io::stderr().lock(), "{line}"),
        };
    }
}
