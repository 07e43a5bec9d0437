//! Repository snapshot provider trait.
//!
//! A provider is bound to one mutable working copy. Methods taking
//! `&mut self` change what is on disk, so exclusive access to the
//! provider is exclusive access to the working copy: one in-flight
//! verification per provider, one provider per worker.

use std::path::{Component, Path};

use crate::domain::{BfcError, ChangedPath, Commit, Result, RevisionId};

pub trait SnapshotProvider: Send + Sync {
    /// Root directory of the working copy.
    fn root(&self) -> &Path;

    /// Revision currently checked out.
    fn head(&self) -> Result<RevisionId>;

    /// Every commit reachable from any ref, newest first.
    fn history(&self) -> Result<Vec<RevisionId>>;

    /// Load a commit with its changes against the first parent.
    fn commit(&self, revision: &RevisionId) -> Result<Commit>;

    /// First parent of `revision`, or `None` for a root commit.
    fn resolve_parent(&self, revision: &RevisionId) -> Result<Option<Commit>>;

    /// Tree diff from `from` to `to`.
    fn diff(&self, from: &RevisionId, to: &RevisionId) -> Result<Vec<ChangedPath>>;

    /// Make the working copy reflect exactly the tree of `revision`.
    ///
    /// Must succeed from any state left behind by an interrupted
    /// verification, which makes it the cleanup action as well.
    fn checkout(&mut self, revision: &RevisionId) -> Result<()>;

    /// File content as stored at `revision`, without checking it out.
    fn read_file_at(&self, revision: &RevisionId, path: &str) -> Result<Option<Vec<u8>>>;

    /// Write `content` at `path` in the working copy, creating missing
    /// parent directories.
    fn overlay(&mut self, path: &str, content: &[u8]) -> Result<()>;
}

/// Reject overlay paths that would escape the working copy.
pub fn validate_overlay_path(path: &str) -> Result<()> {
    let candidate = Path::new(path);
    if path.is_empty() {
        return Err(BfcError::overlay(path, "empty path"));
    }
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(BfcError::overlay(
                    path,
                    "path must be relative to the working copy root",
                ))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_are_accepted() {
        assert!(validate_overlay_path("src/test/java/FooTest.java").is_ok());
        assert!(validate_overlay_path("./tests/a.rs").is_ok());
    }

    #[test]
    fn test_escaping_paths_are_rejected() {
        assert!(validate_overlay_path("../outside.txt").is_err());
        assert!(validate_overlay_path("src/../../etc/passwd").is_err());
        assert!(validate_overlay_path("/etc/passwd").is_err());
        assert!(validate_overlay_path("").is_err());
    }
}
