//! Isolation of the test changes a candidate introduced.

use tracing::{debug, warn};

use crate::config::HarvestConfig;
use crate::domain::{Commit, Result, TestChange, TestChangeSet};
use crate::snapshot::SnapshotProvider;

/// Structural test-path heuristic.
#[derive(Debug, Clone)]
pub struct TestPathFilter {
    dir_segments: Vec<Vec<String>>,
}

impl Default for TestPathFilter {
    fn default() -> Self {
        Self::new(&HarvestConfig::default().test_dir_segments)
    }
}

impl TestPathFilter {
    pub fn new(dir_segments: &[String]) -> Self {
        Self {
            dir_segments: dir_segments
                .iter()
                .map(|s| {
                    s.split('/')
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// A path is test code if it contains "test" in any case, or passes
    /// through one of the configured directory segments.
    pub fn is_test_path(&self, path: &str) -> bool {
        if path.to_lowercase().contains("test") {
            return true;
        }
        let components: Vec<&str> = path.split('/').collect();
        self.dir_segments.iter().any(|segment| {
            components
                .windows(segment.len())
                .any(|w| w.iter().zip(segment).all(|(a, b)| *a == b.as_str()))
        })
    }
}

/// Computes the [`TestChangeSet`] of a candidate.
#[derive(Debug, Clone, Default)]
pub struct TestChangeIsolator {
    filter: TestPathFilter,
}

impl TestChangeIsolator {
    pub fn new(filter: TestPathFilter) -> Self {
        Self { filter }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(TestPathFilter::new(&config.test_dir_segments))
    }

    /// Added or modified test paths between `parent` and `fix`, with their
    /// content as stored at `fix`.
    ///
    /// Deletions and renames are dropped. An empty set means the candidate
    /// cannot be verified through its own tests.
    pub fn isolate<R: SnapshotProvider + ?Sized>(
        &self,
        repo: &R,
        fix: &Commit,
        parent: &Commit,
    ) -> Result<TestChangeSet> {
        let diff = repo.diff(&parent.id, &fix.id)?;
        let mut changes = Vec::new();

        for entry in diff {
            if !entry.kind.introduces_content() || !self.filter.is_test_path(&entry.path) {
                continue;
            }
            match repo.read_file_at(&fix.id, &entry.path)? {
                Some(content) => {
                    debug!(path = %entry.path, bytes = content.len(), "Isolated test change");
                    changes.push(TestChange::new(entry.path, content));
                }
                None => {
                    warn!(
                        commit = %fix.id.short(),
                        path = %entry.path,
                        "Test path missing at fix revision, skipping"
                    );
                }
            }
        }

        Ok(TestChangeSet::new(changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeKind, ChangedPath, RevisionId};
    use crate::fakes::MemoryRepository;

    #[test]
    fn test_filter_matches_test_substring_in_any_case() {
        let f = TestPathFilter::default();
        assert!(f.is_test_path("src/test/java/FooTest.java"));
        assert!(f.is_test_path("tests/parser.rs"));
        assert!(f.is_test_path("lib/__TESTS__/a.js"));
        assert!(f.is_test_path("pkg/util_test.go"));
        assert!(!f.is_test_path("src/main/java/Foo.java"));
        assert!(!f.is_test_path("README.md"));
    }

    #[test]
    fn test_filter_matches_configured_segments() {
        let f = TestPathFilter::new(&["spec".to_string(), "src/it".to_string()]);
        assert!(f.is_test_path("spec/models/user_spec.rb"));
        assert!(f.is_test_path("module/src/it/java/Foo.java"));
        assert!(!f.is_test_path("docs/specification.md"));
        assert!(!f.is_test_path("src/item.rs"));
    }

    fn repo_with_fix(changes: Vec<ChangedPath>) -> (MemoryRepository, Commit, Commit) {
        let mut repo = MemoryRepository::new();
        let parent = repo.add_commit("p", "initial", &[], &[
            ("src/main/Foo.java", "old"),
            ("src/test/OldTest.java", "old test"),
            ("src/test/Moved.java", "moved"),
        ]);
        let fix = repo.add_commit_with_changes(
            "f",
            "Fix bug",
            &["p"],
            &[
                ("src/main/Foo.java", "new"),
                ("src/test/FooTest.java", "new test"),
                ("src/test/Renamed.java", "moved"),
            ],
            changes,
        );
        (repo, fix, parent)
    }

    #[test]
    fn test_isolate_keeps_added_and_modified_test_files() {
        let (repo, fix, parent) = repo_with_fix(vec![
            ChangedPath::new("src/main/Foo.java", ChangeKind::Modified),
            ChangedPath::new("src/test/FooTest.java", ChangeKind::Added),
            ChangedPath::new("src/test/OldTest.java", ChangeKind::Deleted),
            ChangedPath::renamed("src/test/Moved.java", "src/test/Renamed.java"),
        ]);

        let set = TestChangeIsolator::default()
            .isolate(&repo, &fix, &parent)
            .unwrap();
        assert_eq!(set.paths(), vec!["src/test/FooTest.java"]);
        let change = set.iter().next().unwrap();
        assert_eq!(change.content, b"new test".to_vec());
    }

    #[test]
    fn test_isolate_is_empty_without_test_paths() {
        let (repo, fix, parent) = repo_with_fix(vec![ChangedPath::new(
            "src/main/Foo.java",
            ChangeKind::Modified,
        )]);
        let set = TestChangeIsolator::default()
            .isolate(&repo, &fix, &parent)
            .unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_isolate_reads_content_at_fix_not_parent() {
        let mut repo = MemoryRepository::new();
        let parent = repo.add_commit("p", "initial", &[], &[("tests/a_test.rs", "before")]);
        let fix = repo.add_commit("f", "Fix", &["p"], &[("tests/a_test.rs", "after")]);
        let set = TestChangeIsolator::default()
            .isolate(&repo, &fix, &parent)
            .unwrap();
        assert_eq!(set.iter().next().unwrap().content, b"after".to_vec());
        assert_eq!(fix.parent_ids, vec![RevisionId::new("p")]);
    }
}
