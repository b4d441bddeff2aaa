// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Component, Path};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
/// - Only if both attempts fail do we give up.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        let s = rel.to_string_lossy().replace('\\', "/");
        return Some(s);
    }

    // macOS reports events under /private/var/... for a root under /var/...
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            let s = rel.to_string_lossy().replace('\\', "/");
            return Some(s);
        }
    }

    None
}

/// Directory components of `path` below `root`, excluding the file name.
///
/// Falls back to all components of `path` when it does not live under
/// `root` (removed files cannot be canonicalized, for instance). Pure: no
/// filesystem access.
pub fn dir_components<'a>(root: &Path, path: &'a Path) -> impl Iterator<Item = &'a str> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parent = rel.parent().unwrap_or_else(|| Path::new(""));
    parent.components().filter_map(|c| match c {
        Component::Normal(s) => s.to_str(),
        _ => None,
    })
}
