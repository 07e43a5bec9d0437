//! Bug-fix candidates and the test changes isolated from them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::commit::Commit;

/// A commit that passed a discovery heuristic but is not yet verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugFixCandidate {
    pub commit: Commit,
    /// Referenced issue identifier, without the `#` marker.
    pub issue_id: Option<String>,
}

impl BugFixCandidate {
    pub fn new(commit: Commit, issue_id: Option<String>) -> Self {
        Self { commit, issue_id }
    }
}

/// Test file content as stored at the fix revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestChange {
    pub path: String,
    pub content: Vec<u8>,
}

impl TestChange {
    pub fn new(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }

    /// SHA-256 hex digest of the content.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.content);
        hex::encode(hasher.finalize())
    }
}

/// Ordered test changes of one candidate, in diff order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestChangeSet {
    changes: Vec<TestChange>,
}

impl TestChangeSet {
    pub fn new(changes: Vec<TestChange>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestChange> {
        self.changes.iter()
    }

    pub fn paths(&self) -> Vec<String> {
        self.changes.iter().map(|c| c.path.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a TestChangeSet {
    type Item = &'a TestChange;
    type IntoIter = std::slice::Iter<'a, TestChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
