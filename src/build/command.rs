// src/build/command.rs

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::build::{BuildFailure, BuildJob, BuildResult};

/// Build a shell command appropriate for the platform.
pub(crate) fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// Run `job` to completion and describe the outcome.
///
/// Every failure mode (command missing, non-zero exit, artifact absent) is
/// folded into the returned [`BuildResult`]; nothing escapes as an error.
pub async fn run_build(job: &BuildJob, artifact: &Path) -> BuildResult {
    info!(cmd = %job.command, dir = %job.working_dir.display(), "building");

    if let Some(parent) = artifact.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            debug!(dir = %parent.display(), error = %e, "could not create artifact directory");
        }
    }

    let mut cmd = shell_command(&job.command);
    cmd.current_dir(&job.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = match cmd.output().await {
        Ok(output) => output,
        Err(e) => {
            let duration = job.started_at.elapsed();
            let failure = match e.kind() {
                std::io::ErrorKind::NotFound => {
                    BuildFailure::Spawn(format!("{e} (is the toolchain installed?)"))
                }
                std::io::ErrorKind::PermissionDenied => BuildFailure::Spawn(e.to_string()),
                _ => BuildFailure::Io(e.to_string()),
            };
            warn!(cmd = %job.command, error = %failure, "build command could not be started");
            return BuildResult::failed(failure, String::new(), duration);
        }
    };

    let duration = job.started_at.elapsed();
    let mut compiler_output = String::from_utf8_lossy(&output.stdout).into_owned();
    compiler_output.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        debug!(exit_code = code, ?duration, "build command failed");
        return BuildResult::failed(BuildFailure::ExitStatus(code), compiler_output, duration);
    }

    if !artifact.is_file() {
        return BuildResult::failed(
            BuildFailure::ArtifactMissing(artifact.to_path_buf()),
            compiler_output,
            duration,
        );
    }

    info!(?duration, artifact = %artifact.display(), "build succeeded");
    BuildResult::succeeded(artifact, compiler_output, duration)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_exit_with_artifact_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("out/app");
        let job = BuildJob::new("echo compiling; echo 'warning: x' >&2; touch out/app", dir.path());

        let result = run_build(&job, &artifact).await;

        assert!(result.success, "{result:?}");
        assert_eq!(result.artifact_path.as_deref(), Some(artifact.as_path()));
        assert!(result.compiler_output.contains("compiling"));
        assert!(result.compiler_output.contains("warning: x"));
        assert!(result.failure.is_none());
    }

    #[tokio::test]
    async fn non_zero_exit_carries_output_and_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("app");
        std::fs::write(&artifact, "stale").unwrap();
        let job = BuildJob::new("echo 'main.go:3: syntax error' >&2; exit 2", dir.path());

        let result = run_build(&job, &artifact).await;

        assert!(!result.success);
        assert_eq!(result.artifact_path, None);
        assert_eq!(result.failure, Some(BuildFailure::ExitStatus(2)));
        assert!(result.compiler_output.contains("syntax error"));
    }

    #[tokio::test]
    async fn success_without_artifact_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("never-written");
        let job = BuildJob::new("true", dir.path());

        let result = run_build(&job, &artifact).await;

        assert!(!result.success);
        assert_eq!(result.failure, Some(BuildFailure::ArtifactMissing(artifact)));
    }

    #[tokio::test]
    async fn missing_working_dir_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let job = BuildJob::new("true", dir.path().join("gone"));

        let result = run_build(&job, &dir.path().join("app")).await;

        assert!(!result.success);
        assert!(matches!(result.failure, Some(BuildFailure::Spawn(_))));
    }
}
