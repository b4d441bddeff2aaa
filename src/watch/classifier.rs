// src/watch/classifier.rs

//! Deciding whether a changed path should trigger a rebuild.

use std::path::Path;
use std::sync::Arc;

use crate::config::WatchConfig;
use crate::watch::path_utils::dir_components;

/// Pure relevance check over a shared, read-only [`WatchConfig`].
///
/// A path is relevant when none of its directory components below the root
/// is an excluded directory name, and its extension (case-sensitive, no
/// leading dot) is in the include set. Paths without an extension are never
/// relevant.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    config: Arc<WatchConfig>,
}

impl PathClassifier {
    pub fn new(config: Arc<WatchConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        let root = self.config.root();
        if dir_components(root, path).any(|c| self.config.is_excluded_dir(c)) {
            return false;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.config.include_exts().contains(ext),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classifier() -> PathClassifier {
        PathClassifier::new(Arc::new(WatchConfig::with_defaults("/proj")))
    }

    #[test]
    fn included_extension_at_root_is_relevant() {
        assert!(classifier().is_relevant(Path::new("/proj/main.go")));
        assert!(classifier().is_relevant(Path::new("/proj/config/local.yml")));
    }

    #[test]
    fn excluded_directory_wins_over_extension() {
        let c = classifier();
        assert!(!c.is_relevant(Path::new("/proj/vendor/lib.go")));
        assert!(!c.is_relevant(Path::new("/proj/a/b/vendor/c/d.go")));
        assert!(!c.is_relevant(Path::new("/proj/.git/HEAD.json")));
    }

    #[test]
    fn exclusion_is_by_whole_component() {
        let c = classifier();
        assert!(c.is_relevant(Path::new("/proj/vendors/lib.go")));
        assert!(c.is_relevant(Path::new("/proj/mytmp/x.go")));
        // A file *named* like an excluded dir is not a directory component.
        assert!(!c.is_relevant(Path::new("/proj/tmp")));
    }

    #[test]
    fn components_above_the_root_are_ignored() {
        let c = PathClassifier::new(Arc::new(WatchConfig::with_defaults("/home/me/tmp/proj")));
        assert!(c.is_relevant(Path::new("/home/me/tmp/proj/main.go")));
    }

    #[test]
    fn extension_match_is_case_sensitive_and_required() {
        let c = classifier();
        assert!(!c.is_relevant(Path::new("/proj/main.GO")));
        assert!(!c.is_relevant(Path::new("/proj/Makefile")));
        assert!(!c.is_relevant(Path::new("/proj/main.go~")));
        assert!(!c.is_relevant(Path::new("/proj/.main.go.swp")));
    }

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("vendor".to_string()),
            Just("tmp".to_string()),
            Just(".git".to_string()),
            "[a-z]{1,6}",
        ]
    }

    fn extension() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("go".to_string()),
            Just("html".to_string()),
            Just("rs".to_string()),
            Just("GO".to_string()),
            "[a-z]{1,4}",
        ]
    }

    proptest! {
        #[test]
        fn relevance_matches_definition(
            dirs in proptest::collection::vec(segment(), 0..5),
            stem in "[a-z]{1,8}",
            ext in proptest::option::of(extension()),
        ) {
            let c = classifier();
            let mut path = std::path::PathBuf::from("/proj");
            for d in &dirs {
                path.push(d);
            }
            match &ext {
                Some(e) => path.push(format!("{stem}.{e}")),
                None => path.push(&stem),
            }

            let excluded = dirs.iter().any(|d| c.config().is_excluded_dir(d));
            let included = ext
                .as_ref()
                .is_some_and(|e| c.config().include_exts().contains(e.as_str()));

            prop_assert_eq!(c.is_relevant(&path), !excluded && included);
        }
    }
}
