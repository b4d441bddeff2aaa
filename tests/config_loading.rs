// tests/config_loading.rs

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use hotrun::config::{
    load_and_validate, load_or_default, resolve_build_settings, ConfigFile, RawConfigFile,
};
use hotrun::errors::HotrunError;
use hotrun::fs::RealFileSystem;

#[test]
fn full_config_file_is_parsed_and_validated() {
    let root = tempfile::tempdir().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[watch]
root = "{}"
exclude_dirs = [".git", "node_modules"]
include_exts = [".go", "tmpl"]

[build]
cmd = "make build"
artifact = "bin/server"

[run]
args = ["-port", "8080"]
"#,
        root.path().display()
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();

    assert!(cfg.watch.is_excluded_dir("node_modules"));
    assert!(!cfg.watch.is_excluded_dir("vendor"));
    assert!(cfg.watch.include_exts().contains("go"));
    assert!(cfg.watch.include_exts().contains("tmpl"));
    assert_eq!(cfg.build.cmd.as_deref(), Some("make build"));
    assert_eq!(cfg.run.args, vec!["-port", "8080"]);
}

#[test]
fn missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let raw = load_or_default(dir.path().join("Hotrun.toml")).unwrap();

    assert_eq!(raw.watch.exclude_dirs, vec![".git", ".idea", "tmp", "vendor"]);
    assert!(raw.watch.include_exts.iter().any(|e| e == "go"));
    assert!(raw.build.cmd.is_none());
}

#[test]
fn unknown_keys_are_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[watch]\nexclude = [\"tmp\"]\n").unwrap();

    let err = load_or_default(file.path()).unwrap_err();
    assert!(matches!(err, HotrunError::TomlError(_)), "got {err:?}");
}

#[test]
fn discovered_entry_becomes_the_build_command() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir_all(root.join("cmd/api")).unwrap();
    fs::write(root.join("cmd/api/main.go"), "package main\n").unwrap();
    fs::create_dir_all(root.join("vendor/tool")).unwrap();
    fs::write(root.join("vendor/tool/main.go"), "package main\n").unwrap();

    let mut raw = RawConfigFile::default();
    raw.watch.root = root.clone();
    let cfg = ConfigFile::try_from(raw).unwrap();

    let settings = resolve_build_settings(&cfg, None, &RealFileSystem).unwrap();

    let artifact = format!("tmp/main{}", std::env::consts::EXE_SUFFIX);
    assert_eq!(settings.command, format!("go build -o {artifact} ./cmd/api"));
    assert_eq!(settings.artifact, root.join(PathBuf::from(&artifact)));
    assert_eq!(settings.working_dir, root);
}

#[test]
fn ambiguous_entries_are_listed() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    for svc in ["cmd/api", "cmd/worker"] {
        fs::create_dir_all(root.join(svc)).unwrap();
        fs::write(root.join(svc).join("main.go"), "package main\n").unwrap();
    }

    let mut raw = RawConfigFile::default();
    raw.watch.root = root;
    let cfg = ConfigFile::try_from(raw).unwrap();

    match resolve_build_settings(&cfg, None, &RealFileSystem) {
        Err(HotrunError::ConfigError(msg)) => {
            assert!(msg.contains("./cmd/api"));
            assert!(msg.contains("./cmd/worker"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}
