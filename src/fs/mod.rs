// src/fs/mod.rs

//! Minimal filesystem abstraction used for directory walks.
//!
//! The watcher registers directories and entry discovery looks for
//! `main.go` files through this trait, so both can be exercised against
//! [`mock::MockFileSystem`] without touching the disk.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// Return the entries of a directory as full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("canonicalizing {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }
}

/// Walk `start` depth-first and collect every directory below it
/// (including `start`), skipping any directory `prune` rejects.
///
/// Directories that cannot be read are reported through `on_error` and
/// their subtree is skipped; the walk carries on with their siblings.
pub fn walk_dirs(
    fs: &dyn FileSystem,
    start: &Path,
    prune: &dyn Fn(&Path) -> bool,
    on_error: &mut dyn FnMut(&Path, &anyhow::Error),
) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![start.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(e) => e,
            Err(err) => {
                on_error(&dir, &err);
                continue;
            }
        };
        found.push(dir);

        for entry in entries.into_iter().rev() {
            if fs.is_dir(&entry) && !prune(&entry) {
                stack.push(entry);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::mock::MockFileSystem;
    use super::*;

    #[test]
    fn walk_skips_pruned_subtrees() {
        let fs = MockFileSystem::new();
        fs.add_file("main.go", "package main");
        fs.add_file("internal/handler/user.go", "package handler");
        fs.add_file("vendor/lib/lib.go", "package lib");

        let dirs = walk_dirs(
            &fs,
            Path::new("."),
            &|p| p.file_name().is_some_and(|n| n == "vendor"),
            &mut |_, _| {},
        );

        assert!(dirs.contains(&PathBuf::from("./internal")));
        assert!(dirs.contains(&PathBuf::from("./internal/handler")));
        assert!(!dirs.iter().any(|d| d.starts_with("./vendor")));
    }

    #[test]
    fn unreadable_directory_is_reported_and_skipped() {
        let fs = MockFileSystem::new();
        fs.add_file("a/one.go", "");
        fs.add_file("b/two.go", "");
        fs.deny("./a");

        let mut errors = Vec::new();
        let dirs = walk_dirs(&fs, Path::new("."), &|_| false, &mut |p, _| {
            errors.push(p.to_path_buf())
        });

        assert_eq!(errors, vec![PathBuf::from("./a")]);
        assert!(dirs.contains(&PathBuf::from("./b")));
        assert!(!dirs.contains(&PathBuf::from("./a")));
    }
}
