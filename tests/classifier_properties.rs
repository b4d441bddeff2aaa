// tests/classifier_properties.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use hotrun::engine::Debouncer;
use hotrun::watch::PathClassifier;
use hotrun_test_utils::WatchConfigBuilder;

const EXCLUDED: &[&str] = &[".git", "tmp", "vendor", "node_modules"];
const EXTS: &[&str] = &["go", "html", "tmpl", "rs", "md", "GO"];

fn classifier() -> PathClassifier {
    PathClassifier::new(Arc::new(
        WatchConfigBuilder::new("/work/app")
            .exclude("node_modules")
            .only_exts(&["go", "html", "tmpl"])
            .build(),
    ))
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

proptest! {
    #[test]
    fn any_path_through_an_excluded_dir_is_irrelevant(
        before in proptest::collection::vec(segment(), 0..3),
        excluded in proptest::sample::select(EXCLUDED),
        after in proptest::collection::vec(segment(), 0..3),
        stem in segment(),
        ext in proptest::sample::select(EXTS),
    ) {
        let mut path = PathBuf::from("/work/app");
        path.extend(&before);
        path.push(excluded);
        path.extend(&after);
        path.push(format!("{stem}.{ext}"));

        prop_assert!(!classifier().is_relevant(&path));
    }

    #[test]
    fn relevance_outside_excluded_dirs_follows_the_extension(
        dirs in proptest::collection::vec(segment(), 0..4),
        stem in segment(),
        ext in proptest::sample::select(EXTS),
    ) {
        prop_assume!(!dirs.iter().any(|d| EXCLUDED.contains(&d.as_str())));

        let mut path = PathBuf::from("/work/app");
        path.extend(&dirs);
        path.push(format!("{stem}.{ext}"));

        let expected = ["go", "html", "tmpl"].contains(&ext);
        prop_assert_eq!(classifier().is_relevant(&path), expected);
    }

    #[test]
    fn a_burst_fires_exactly_once(gaps in proptest::collection::vec(0u64..299, 1..30)) {
        let quiet = Duration::from_millis(300);
        let mut debouncer = Debouncer::new(quiet);
        let mut now = Instant::now();
        let mut fired = 0;

        for gap in &gaps {
            now += Duration::from_millis(*gap);
            if debouncer.fire(now).is_some() {
                fired += 1;
            }
            debouncer.record(now);
        }

        // Gaps are shorter than the window, so nothing fired mid-burst.
        prop_assert_eq!(fired, 0);
        prop_assert_eq!(debouncer.fire(now + quiet), Some(gaps.len()));
        prop_assert_eq!(debouncer.fire(now + quiet * 10), None);
    }
}

#[test]
fn extensionless_files_are_ignored() {
    assert!(!classifier().is_relevant(std::path::Path::new("/work/app/Makefile")));
    assert!(!classifier().is_relevant(std::path::Path::new("/work/app/.env")));
}
