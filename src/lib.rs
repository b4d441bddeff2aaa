// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod signals;
pub mod supervisor;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::build::RealBuildBackend;
use crate::cli::{split_list, CliArgs};
use crate::config::{load_or_default, resolve_build_settings, ConfigFile, RawConfigFile};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, TriggerReason, QUIET_WINDOW};
use crate::fs::{FileSystem, RealFileSystem};
use crate::signals::{forward_shutdown, ShutdownSignals};
use crate::supervisor::{StdioSink, Supervisor, TokioLauncher, GRACE_PERIOD};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - entry discovery / build command resolution
/// - file watcher and change forwarding
/// - build loop, supervisor and runtime
/// - shutdown signal handling
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let mut raw = load_or_default(&args.config)?;
    apply_cli_overrides(&mut raw, &args);
    if let Ok(root) = fs.canonicalize(&raw.watch.root) {
        raw.watch.root = root;
    }
    let cfg = ConfigFile::try_from(raw)?;

    let settings = resolve_build_settings(&cfg, args.target.as_deref(), fs.as_ref())?;
    info!(
        root = %cfg.watch.root().display(),
        command = %settings.command,
        "watching for changes"
    );
    debug!(
        exclude = ?cfg.watch.exclude_dirs(),
        include = ?cfg.watch.include_exts(),
        "watch filters"
    );

    let watch_cfg = Arc::new(cfg.watch);

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // File watcher → runtime.
    let (watcher_handle, changes) = watch::spawn_watcher(Arc::clone(&watch_cfg), Arc::clone(&fs))?;
    tokio::spawn(watch::forward_to_runtime(changes, rt_tx.clone()));

    // SIGINT / SIGTERM / SIGHUP → graceful shutdown.
    let signals = ShutdownSignals::install()?;
    forward_shutdown(signals, rt_tx.clone());

    // Initial build.
    rt_tx
        .send(RuntimeEvent::RebuildRequested {
            reason: TriggerReason::Startup,
        })
        .await?;

    let launcher = TokioLauncher::new(settings.args.clone(), settings.working_dir.clone());
    let supervisor = Supervisor::new(launcher, Arc::new(StdioSink), GRACE_PERIOD);
    let builder = RealBuildBackend::new(settings, rt_tx);
    let core = CoreRuntime::new(watch_cfg, QUIET_WINDOW);

    let runtime = Runtime::new(core, rt_rx, builder, supervisor);
    let result = runtime.run().await;

    watcher_handle.stop().await;
    result.map_err(Into::into)
}

/// Layer command-line flags over the values read from the config file.
pub fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(root) = &args.root {
        raw.watch.root = root.into();
    }
    if let Some(dirs) = &args.exclude_dir {
        raw.watch.exclude_dirs = split_list(dirs);
    }
    if let Some(exts) = &args.include_ext {
        raw.watch.include_exts = split_list(exts);
    }
    if !args.app_args.is_empty() {
        raw.run.args = args.app_args.clone();
    }
}
