// src/config/discover.rs

//! Turning configuration plus an optional CLI target into a concrete build
//! command.
//!
//! With no `[build].cmd` and no target, the project is searched for
//! `main.go` files. Exactly one candidate is built; none means the root
//! package; several is an error that lists them.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::model::{ConfigFile, WatchConfig};
use crate::errors::{HotrunError, Result};
use crate::fs::{walk_dirs, FileSystem};
use crate::watch::path_utils::relative_str;

const ENTRY_FILE: &str = "main.go";

/// Everything the builder and the supervisor need to know about the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Shell command run in `working_dir`.
    pub command: String,
    /// Absolute path of the executable the command produces.
    pub artifact: PathBuf,
    pub working_dir: PathBuf,
    /// Arguments for the launched program.
    pub args: Vec<String>,
}

/// Find the single directory under the root that contains a `main.go`.
///
/// Returns the directory relative to the root (`""` for the root itself),
/// or `None` when there is no candidate.
pub fn discover_entry(fs: &dyn FileSystem, watch: &WatchConfig) -> Result<Option<String>> {
    let root = watch.root();
    let prune = |p: &Path| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| watch.is_excluded_dir(n))
    };
    let dirs = walk_dirs(fs, root, &prune, &mut |dir, err| {
        debug!(dir = %dir.display(), error = %err, "skipping unreadable directory during discovery");
    });

    let candidates: Vec<String> = dirs
        .iter()
        .filter(|d| fs.is_file(&d.join(ENTRY_FILE)))
        .filter_map(|d| relative_str(root, d))
        .collect();

    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.into_iter().next()),
        _ => {
            let listed: Vec<String> = candidates
                .iter()
                .map(|c| format!("  {}", go_package(c)))
                .collect();
            Err(HotrunError::ConfigError(format!(
                "found several {ENTRY_FILE} files; pass the one to run as TARGET:\n{}",
                listed.join("\n")
            )))
        }
    }
}

/// Resolve the build command, artifact and run arguments.
pub fn resolve_build_settings(
    cfg: &ConfigFile,
    target: Option<&str>,
    fs: &dyn FileSystem,
) -> Result<BuildSettings> {
    let root = cfg.watch.root().to_path_buf();
    let artifact_rel = cfg.build.artifact.clone();
    let artifact = if artifact_rel.is_absolute() {
        artifact_rel.clone()
    } else {
        root.join(&artifact_rel)
    };

    let command = match (&cfg.build.cmd, target) {
        (Some(cmd), t) => {
            if let Some(t) = t {
                warn!(target = %t, "[build].cmd is set; ignoring TARGET");
            }
            cmd.clone()
        }
        (None, Some(t)) => go_build_command(&artifact_rel, &go_package(t)),
        (None, None) => {
            let package = match discover_entry(fs, &cfg.watch)? {
                Some(rel) => go_package(&rel),
                None => {
                    info!("no {ENTRY_FILE} found below the root; building the root package");
                    ".".to_string()
                }
            };
            go_build_command(&artifact_rel, &package)
        }
    };

    Ok(BuildSettings {
        command,
        artifact,
        working_dir: root,
        args: cfg.run.args.clone(),
    })
}

fn go_build_command(artifact: &Path, package: &str) -> String {
    let out = artifact.to_string_lossy().replace('\\', "/");
    format!("go build -o {out} {package}")
}

/// Spell a relative directory the way `go build` expects a local package.
fn go_package(rel: &str) -> String {
    let rel = rel.replace('\\', "/");
    if rel.is_empty() || rel == "." {
        ".".to_string()
    } else if rel.starts_with("./") || rel.starts_with("../") || rel.starts_with('/') {
        rel
    } else {
        format!("./{rel}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{BuildSection, RunSection};
    use crate::fs::mock::MockFileSystem;

    fn config(cmd: Option<&str>) -> ConfigFile {
        ConfigFile::new_unchecked(
            WatchConfig::with_defaults("."),
            BuildSection {
                cmd: cmd.map(str::to_string),
                artifact: PathBuf::from("tmp/main"),
            },
            RunSection::default(),
        )
    }

    #[test]
    fn single_entry_is_discovered() {
        let fs = MockFileSystem::new();
        fs.add_file("cmd/server/main.go", "package main");
        fs.add_file("internal/service/user.go", "package service");
        fs.add_file("vendor/x/main.go", "package main");

        let found = discover_entry(&fs, &WatchConfig::with_defaults(".")).unwrap();
        assert_eq!(found.as_deref(), Some("cmd/server"));

        let settings = resolve_build_settings(&config(None), None, &fs).unwrap();
        assert_eq!(settings.command, "go build -o tmp/main ./cmd/server");
        assert_eq!(settings.artifact, PathBuf::from("./tmp/main"));
    }

    #[test]
    fn several_entries_are_an_error() {
        let fs = MockFileSystem::new();
        fs.add_file("cmd/server/main.go", "");
        fs.add_file("cmd/task/main.go", "");

        match discover_entry(&fs, &WatchConfig::with_defaults(".")) {
            Err(HotrunError::ConfigError(msg)) => {
                assert!(msg.contains("./cmd/server"));
                assert!(msg.contains("./cmd/task"));
            }
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn no_entry_builds_root_package() {
        let fs = MockFileSystem::new();
        fs.add_file("lib.go", "package lib");

        let settings = resolve_build_settings(&config(None), None, &fs).unwrap();
        assert_eq!(settings.command, "go build -o tmp/main .");
    }

    #[test]
    fn explicit_target_skips_discovery() {
        let fs = MockFileSystem::new();
        fs.add_file("cmd/a/main.go", "");
        fs.add_file("cmd/b/main.go", "");

        let settings = resolve_build_settings(&config(None), Some("cmd/b"), &fs).unwrap();
        assert_eq!(settings.command, "go build -o tmp/main ./cmd/b");
    }

    #[test]
    fn configured_command_wins() {
        let fs = MockFileSystem::new();
        let settings =
            resolve_build_settings(&config(Some("make build")), Some("cmd/b"), &fs).unwrap();
        assert_eq!(settings.command, "make build");
    }
}
