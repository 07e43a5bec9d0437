//! Commit metadata as reported by the version-control backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex identifier of a revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(pub String);

impl RevisionId {
    pub fn new(id: impl Into<String>) -> Self {
        RevisionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for log lines.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RevisionId {
    fn from(s: &str) -> Self {
        RevisionId(s.to_string())
    }
}

/// Kind of change a path underwent between two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    /// Map a `git diff --name-status` letter to a change kind.
    ///
    /// Copies create a new path and are reported as `Added`; type changes
    /// keep the path and are reported as `Modified`.
    pub fn from_status(status: &str) -> Option<Self> {
        match status.chars().next()? {
            'A' | 'C' => Some(ChangeKind::Added),
            'M' | 'T' => Some(ChangeKind::Modified),
            'D' => Some(ChangeKind::Deleted),
            'R' => Some(ChangeKind::Renamed),
            _ => None,
        }
    }

    /// Whether the change leaves new content at the path.
    pub fn introduces_content(&self) -> bool {
        matches!(self, ChangeKind::Added | ChangeKind::Modified)
    }
}

/// One entry of a tree diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedPath {
    /// Path after the change (the removed path for deletions).
    pub path: String,
    pub kind: ChangeKind,
    /// Source path of a rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

impl ChangedPath {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            old_path: None,
        }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            path: to.into(),
            kind: ChangeKind::Renamed,
            old_path: Some(from.into()),
        }
    }
}

/// Immutable commit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: RevisionId,
    pub message: String,
    /// Parents in recorded order; the first one is the mainline parent.
    pub parent_ids: Vec<RevisionId>,
    /// Paths changed against the first parent (against the empty tree
    /// for a root commit).
    pub changed_paths: Vec<ChangedPath>,
}

impl Commit {
    pub fn first_parent(&self) -> Option<&RevisionId> {
        self.parent_ids.first()
    }

    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(parents: &[&str]) -> Commit {
        Commit {
            id: RevisionId::new("0123456789abcdef"),
            message: "Fix NPE in parser\n\nLonger body".to_string(),
            parent_ids: parents.iter().map(|p| RevisionId::from(*p)).collect(),
            changed_paths: vec![],
        }
    }

    #[test]
    fn test_revision_short() {
        assert_eq!(RevisionId::new("0123456789abcdef").short(), "01234567");
        assert_eq!(RevisionId::new("abc").short(), "abc");
    }

    #[test]
    fn test_revision_short_counts_characters() {
        let id = RevisionId::new("abcdefg\u{e9}\u{e9}\u{e9}");
        assert_eq!(id.short(), "abcdefg\u{e9}");
        assert_eq!(RevisionId::new("\u{e9}\u{e9}").short(), "\u{e9}\u{e9}");
    }

    #[test]
    fn test_change_kind_from_status() {
        assert_eq!(ChangeKind::from_status("A"), Some(ChangeKind::Added));
        assert_eq!(ChangeKind::from_status("M"), Some(ChangeKind::Modified));
        assert_eq!(ChangeKind::from_status("T"), Some(ChangeKind::Modified));
        assert_eq!(ChangeKind::from_status("D"), Some(ChangeKind::Deleted));
        assert_eq!(ChangeKind::from_status("R087"), Some(ChangeKind::Renamed));
        assert_eq!(ChangeKind::from_status("C100"), Some(ChangeKind::Added));
        assert_eq!(ChangeKind::from_status("X"), None);
        assert_eq!(ChangeKind::from_status(""), None);
    }

    #[test]
    fn test_introduces_content() {
        assert!(ChangeKind::Added.introduces_content());
        assert!(ChangeKind::Modified.introduces_content());
        assert!(!ChangeKind::Deleted.introduces_content());
        assert!(!ChangeKind::Renamed.introduces_content());
    }

    #[test]
    fn test_commit_shape_predicates() {
        assert!(commit(&[]).is_root());
        assert!(!commit(&["a"]).is_root());
        assert!(!commit(&["a"]).is_merge());
        assert!(commit(&["a", "b"]).is_merge());
        assert_eq!(commit(&["a", "b"]).first_parent(), Some(&RevisionId::from("a")));
    }

    #[test]
    fn test_subject_is_first_line() {
        assert_eq!(commit(&[]).subject(), "Fix NPE in parser");
    }
}
