//! Candidate discovery strategies.
//!
//! Provides:
//! - [`history::HistoryScan`]: walk every commit and classify it
//! - [`issues::IssueEventDiscovery`]: follow closed bug issues to the commit that closed them
//!
//! Both produce the same [`BugFixCandidate`] values and feed the same
//! verification protocol.

pub mod history;
pub mod issues;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{BugFixCandidate, Result};
use crate::snapshot::SnapshotProvider;

pub use history::HistoryScan;
pub use issues::{select_closing_commit, IssueEvent, IssueEventDiscovery, IssueTracker, TrackedIssue};

/// A reference a discovery strategy could not turn into a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedReference {
    /// Commit id or issue number.
    pub reference: String,
    pub reason: String,
}

impl SkippedReference {
    pub fn new(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Candidates found by one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub candidates: Vec<BugFixCandidate>,
    pub skipped: Vec<SkippedReference>,
}

/// A producer of bug-fix candidates.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;

    /// Discover candidates in `repo`. Unresolvable references are recorded
    /// in the report; only failures of the whole pass are errors.
    async fn discover(&self, repo: &dyn SnapshotProvider) -> Result<DiscoveryReport>;
}
