// src/watch/watcher.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::engine::RuntimeEvent;
use crate::errors::{HotrunError, Result};
use crate::fs::FileSystem;
use crate::types::{ChangeEvent, ChangeKind};

/// Handle for the filesystem watcher.
///
/// The OS watcher lives inside a background task. Dropping this handle (or
/// calling [`WatcherHandle::stop`]) ends that task and with it all watching.
pub struct WatcherHandle {
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl WatcherHandle {
    /// Stop watching and wait for the background task to finish.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            debug!(error = %e, "watcher task ended abnormally");
        }
    }
}

/// Lazy, unbounded sequence of raw change events.
///
/// Ends (`next` yields `None`) once the watcher behind it is stopped.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeStream {
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

/// A detached sender/stream pair, for feeding events from elsewhere.
pub fn change_channel() -> (mpsc::UnboundedSender<ChangeEvent>, ChangeStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ChangeStream { rx })
}

/// Start watching `config.root()` and every directory below it.
///
/// Directories named in the exclude set are not registered. A directory
/// that cannot be registered or read is logged as a
/// [`HotrunError::WatchSetup`] and its subtree skipped; only a failure on
/// the root itself is returned as an error.
pub fn spawn_watcher(
    config: Arc<WatchConfig>,
    fs: Arc<dyn FileSystem>,
) -> Result<(WatcherHandle, ChangeStream)> {
    let root = config.root().to_path_buf();

    // Channel from the blocking notify callback into the async world.
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Receiver gone means the watcher task is shutting down.
            let _ = raw_tx.send(res);
        },
        Config::default(),
    )
    .map_err(|e| HotrunError::watch_setup(&root, e))?;

    watcher
        .watch(&root, RecursiveMode::NonRecursive)
        .map_err(|e| HotrunError::watch_setup(&root, e))?;

    let mut tree = WatchedTree {
        config: Arc::clone(&config),
        fs,
        dirs: HashSet::new(),
    };
    tree.dirs.insert(root.clone());
    tree.register_children(&mut watcher, &root, None);

    info!(root = %root.display(), dirs = tree.dirs.len(), "file watcher started");

    let (out_tx, out_rx) = mpsc::unbounded_channel::<ChangeEvent>();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                raw = raw_rx.recv() => match raw {
                    None => break,
                    Some(Err(err)) => warn!(error = %err, "file watch error"),
                    Some(Ok(event)) => {
                        if !tree.forward(&mut watcher, event, &out_tx) {
                            debug!("change stream dropped; stopping watcher");
                            break;
                        }
                    }
                },
            }
        }
        debug!("watcher event loop finished");
    });

    Ok((
        WatcherHandle {
            stop: Some(stop_tx),
            task,
        },
        ChangeStream { rx: out_rx },
    ))
}

/// Pump a [`ChangeStream`] into the runtime event channel.
pub async fn forward_to_runtime(mut stream: ChangeStream, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    while let Some(event) = stream.next().await {
        if runtime_tx.send(RuntimeEvent::FileChanged(event)).await.is_err() {
            break;
        }
    }
    debug!("change forwarder finished");
}

/// Map a notify event kind onto a [`ChangeKind`].
pub(crate) fn change_kind(kind: &EventKind) -> ChangeKind {
    match kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Access(_) => ChangeKind::Accessed,
        EventKind::Any | EventKind::Other => ChangeKind::Modified,
    }
}

/// Per-directory registration with the OS notification backend.
trait DirWatch {
    fn watch_dir(&mut self, dir: &Path) -> notify::Result<()>;
    fn unwatch_dir(&mut self, dir: &Path);
}

impl DirWatch for RecommendedWatcher {
    fn watch_dir(&mut self, dir: &Path) -> notify::Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
    }

    fn unwatch_dir(&mut self, dir: &Path) {
        // Fails when the kernel already dropped the watch with the directory.
        if let Err(e) = self.unwatch(dir) {
            debug!(dir = %dir.display(), error = %e, "unwatch");
        }
    }
}

/// Bookkeeping for the directories currently registered with the OS.
struct WatchedTree {
    config: Arc<WatchConfig>,
    fs: Arc<dyn FileSystem>,
    dirs: HashSet<PathBuf>,
}

impl WatchedTree {
    fn pruned(&self, dir: &Path) -> bool {
        dir.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.config.is_excluded_dir(n))
    }

    /// Emit events for one notification and follow directory moves.
    ///
    /// Returns `false` once nobody listens any more.
    fn forward(
        &mut self,
        watcher: &mut impl DirWatch,
        event: Event,
        out: &mpsc::UnboundedSender<ChangeEvent>,
    ) -> bool {
        let kind = change_kind(&event.kind);

        for path in event.paths {
            if matches!(kind, ChangeKind::Removed | ChangeKind::Renamed) {
                self.forget_tree(watcher, &path);
            }

            let is_new_dir = matches!(kind, ChangeKind::Created | ChangeKind::Renamed)
                && !self.dirs.contains(&path)
                && self.fs.is_dir(&path)
                && !self.pruned(&path);

            if out.send(ChangeEvent::new(path.clone(), kind)).is_err() {
                return false;
            }

            if is_new_dir {
                self.register_tree(watcher, &path, Some(out));
            }
        }
        true
    }

    /// Drop `dir` and everything registered below it. A directory later
    /// created at the same path is then registered afresh.
    fn forget_tree(&mut self, watcher: &mut impl DirWatch, dir: &Path) {
        let gone: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|d| d.starts_with(dir))
            .cloned()
            .collect();
        for d in gone {
            watcher.unwatch_dir(&d);
            self.dirs.remove(&d);
        }
    }

    /// Register `dir` and everything below it.
    ///
    /// With `announce` set, files already inside are reported as created:
    /// a tree moved in atomically produces no events of its own.
    fn register_tree(
        &mut self,
        watcher: &mut impl DirWatch,
        dir: &Path,
        announce: Option<&mpsc::UnboundedSender<ChangeEvent>>,
    ) {
        if let Err(e) = watcher.watch_dir(dir) {
            warn!(error = %HotrunError::watch_setup(dir, e), "skipping subtree");
            return;
        }
        debug!(dir = %dir.display(), "watching new directory");
        self.dirs.insert(dir.to_path_buf());
        self.register_children(watcher, dir, announce);
    }

    fn register_children(
        &mut self,
        watcher: &mut impl DirWatch,
        dir: &Path,
        announce: Option<&mpsc::UnboundedSender<ChangeEvent>>,
    ) {
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %HotrunError::watch_setup(dir, e), "skipping subtree");
                return;
            }
        };

        for entry in entries {
            if self.fs.is_dir(&entry) {
                if !self.pruned(&entry) && !self.dirs.contains(&entry) {
                    self.register_tree(watcher, &entry, announce);
                }
            } else if let Some(out) = announce {
                let _ = out.send(ChangeEvent::new(entry, ChangeKind::Created));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};

    #[test]
    fn notify_kinds_map_onto_change_kinds() {
        assert_eq!(change_kind(&EventKind::Create(CreateKind::File)), ChangeKind::Created);
        assert_eq!(
            change_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            ChangeKind::Modified
        );
        assert_eq!(
            change_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            ChangeKind::Renamed
        );
        assert_eq!(change_kind(&EventKind::Remove(RemoveKind::Any)), ChangeKind::Removed);
        assert_eq!(change_kind(&EventKind::Access(AccessKind::Any)), ChangeKind::Accessed);
        assert_eq!(change_kind(&EventKind::Any), ChangeKind::Modified);
    }

    /// Records registrations; refuses the directories in `refuse`.
    #[derive(Default)]
    struct RecordingWatch {
        refuse: HashSet<PathBuf>,
        watched: HashSet<PathBuf>,
    }

    impl DirWatch for RecordingWatch {
        fn watch_dir(&mut self, dir: &Path) -> notify::Result<()> {
            if self.refuse.contains(dir) {
                return Err(notify::Error::generic("no space left for watches"));
            }
            self.watched.insert(dir.to_path_buf());
            Ok(())
        }

        fn unwatch_dir(&mut self, dir: &Path) {
            self.watched.remove(dir);
        }
    }

    fn tree(fs: &MockFileSystem) -> WatchedTree {
        WatchedTree {
            config: Arc::new(WatchConfig::with_defaults("/proj")),
            fs: Arc::new(fs.clone()),
            dirs: HashSet::new(),
        }
    }

    fn dirs(paths: &[&str]) -> HashSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ChangeEvent>) -> Vec<PathBuf> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.path);
        }
        seen
    }

    #[test]
    fn unreadable_subtree_is_skipped_and_siblings_registered() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/main.go", "package main");
        fs.add_file("/proj/secret/deep/x.go", "package deep");
        fs.add_file("/proj/api/handler.go", "package api");
        fs.add_dir("/proj/vendor/dep");
        fs.deny("/proj/secret");

        let mut tree = tree(&fs);
        let mut watch = RecordingWatch::default();
        tree.register_tree(&mut watch, Path::new("/proj"), None);

        // `secret` itself is watchable; only its contents are hidden.
        assert_eq!(tree.dirs, dirs(&["/proj", "/proj/api", "/proj/secret"]));
        assert_eq!(watch.watched, tree.dirs);
    }

    #[test]
    fn refused_registration_skips_only_that_subtree() {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj/a/inner");
        fs.add_dir("/proj/b");

        let mut tree = tree(&fs);
        let mut watch = RecordingWatch {
            refuse: dirs(&["/proj/a"]),
            ..Default::default()
        };
        tree.register_tree(&mut watch, Path::new("/proj"), None);

        assert_eq!(tree.dirs, dirs(&["/proj", "/proj/b"]));
    }

    #[test]
    fn renamed_directory_is_followed_and_recreation_registered() {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj/pkg_old/sub");
        let mut tree = tree(&fs);
        let mut watch = RecordingWatch::default();
        // State before `mv pkg pkg_old`.
        for d in ["/proj", "/proj/pkg", "/proj/pkg/sub"] {
            watch.watch_dir(Path::new(d)).unwrap();
            tree.dirs.insert(PathBuf::from(d));
        }
        let (out, mut rx) = mpsc::unbounded_channel();

        let renamed = EventKind::Modify(ModifyKind::Name(RenameMode::Both));
        assert!(tree.forward(&mut watch, event(renamed, &["/proj/pkg", "/proj/pkg_old"]), &out));

        assert_eq!(tree.dirs, dirs(&["/proj", "/proj/pkg_old", "/proj/pkg_old/sub"]));
        assert_eq!(watch.watched, tree.dirs);
        assert_eq!(drain(&mut rx), [PathBuf::from("/proj/pkg"), PathBuf::from("/proj/pkg_old")]);

        // `mkdir pkg` with a file already inside by the time it is read.
        fs.add_file("/proj/pkg/a.go", "package pkg");
        let created = EventKind::Create(CreateKind::Folder);
        assert!(tree.forward(&mut watch, event(created, &["/proj/pkg"]), &out));

        assert!(tree.dirs.contains(Path::new("/proj/pkg")));
        assert!(watch.watched.contains(Path::new("/proj/pkg")));
        assert_eq!(drain(&mut rx), [PathBuf::from("/proj/pkg"), PathBuf::from("/proj/pkg/a.go")]);
    }

    #[test]
    fn removal_forgets_the_whole_subtree() {
        let fs = MockFileSystem::new();
        let mut tree = tree(&fs);
        let mut watch = RecordingWatch::default();
        for d in ["/proj", "/proj/internal", "/proj/internal/db", "/proj/internal_tools"] {
            watch.watch_dir(Path::new(d)).unwrap();
            tree.dirs.insert(PathBuf::from(d));
        }
        let (out, _rx) = mpsc::unbounded_channel();

        let removed = EventKind::Remove(RemoveKind::Folder);
        tree.forward(&mut watch, event(removed, &["/proj/internal"]), &out);

        assert_eq!(tree.dirs, dirs(&["/proj", "/proj/internal_tools"]));
        assert_eq!(watch.watched, tree.dirs);
    }

    #[test]
    fn access_events_are_passed_through() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/main.go", "package main");
        let mut tree = tree(&fs);
        let (out, mut rx) = mpsc::unbounded_channel();

        let access = EventKind::Access(AccessKind::Any);
        tree.forward(&mut RecordingWatch::default(), event(access, &["/proj/main.go"]), &out);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, ChangeKind::Accessed);
    }
}
