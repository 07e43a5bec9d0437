//! Issue-tracker-driven discovery.
//!
//! Closed issues labelled as bugs are followed to the commit linked by
//! their "closed" event. The commit must exist in the local working copy
//! and have exactly one parent.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CandidateSource, DiscoveryReport, SkippedReference};
use crate::config::ClosingEventPolicy;
use crate::domain::{BugFixCandidate, Result, RevisionId};
use crate::obs::emit_candidate_found;
use crate::snapshot::SnapshotProvider;

/// A closed issue returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedIssue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
}

/// One lifecycle event of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    /// Event kind, e.g. "closed", "reopened", "labeled".
    pub event: String,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl IssueEvent {
    pub fn closed_by(commit_id: &str) -> Self {
        Self {
            event: "closed".to_string(),
            commit_id: Some(commit_id.to_string()),
            created_at: None,
        }
    }
}

/// Issue tracker queries needed for discovery.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Closed issues labelled "bug" in `repo` (an `owner/name` slug).
    async fn closed_bug_issues(&self, repo: &str) -> Result<Vec<TrackedIssue>>;

    /// Lifecycle events of one issue, oldest first.
    async fn issue_events(&self, repo: &str, number: u64) -> Result<Vec<IssueEvent>>;
}

/// Commit linked by the authoritative "closed" event, per `policy`.
///
/// Closed events without a commit (closed by hand) are ignored.
pub fn select_closing_commit(events: &[IssueEvent], policy: ClosingEventPolicy) -> Option<RevisionId> {
    let mut closing = events
        .iter()
        .filter(|e| e.event == "closed")
        .filter_map(|e| e.commit_id.as_deref());
    let chosen = match policy {
        ClosingEventPolicy::First => closing.next(),
        ClosingEventPolicy::Last => closing.last(),
    };
    chosen.map(RevisionId::from)
}

pub struct IssueEventDiscovery<T> {
    tracker: T,
    repo_slug: String,
    policy: ClosingEventPolicy,
}

impl<T: IssueTracker> IssueEventDiscovery<T> {
    pub fn new(tracker: T, repo_slug: impl Into<String>, policy: ClosingEventPolicy) -> Self {
        Self {
            tracker,
            repo_slug: repo_slug.into(),
            policy,
        }
    }
}

#[async_trait]
impl<T: IssueTracker> CandidateSource for IssueEventDiscovery<T> {
    fn name(&self) -> &str {
        "issues"
    }

    async fn discover(&self, repo: &dyn SnapshotProvider) -> Result<DiscoveryReport> {
        let issues = self.tracker.closed_bug_issues(&self.repo_slug).await?;
        info!(repo = %self.repo_slug, issues = issues.len(), "Fetched closed bug issues");

        let mut report = DiscoveryReport::default();
        let mut seen = HashSet::new();

        for issue in issues {
            let reference = format!("#{}", issue.number);
            let events = match self.tracker.issue_events(&self.repo_slug, issue.number).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(issue = issue.number, error = %e, "Skipping issue, events unavailable");
                    report.skipped.push(SkippedReference::new(reference, e.to_string()));
                    continue;
                }
            };

            let Some(revision) = select_closing_commit(&events, self.policy) else {
                report
                    .skipped
                    .push(SkippedReference::new(reference, "no closing commit"));
                continue;
            };

            let commit = match repo.commit(&revision) {
                Ok(commit) => commit,
                Err(e) => {
                    warn!(issue = issue.number, commit = %revision.short(), error = %e, "Closing commit not resolvable");
                    report.skipped.push(SkippedReference::new(reference, e.to_string()));
                    continue;
                }
            };

            if commit.parent_ids.len() != 1 {
                report.skipped.push(SkippedReference::new(
                    reference,
                    format!("closing commit has {} parents", commit.parent_ids.len()),
                ));
                continue;
            }

            if !seen.insert(commit.id.clone()) {
                report.skipped.push(SkippedReference::new(
                    reference,
                    format!("commit {} already claimed by another issue", commit.id.short()),
                ));
                continue;
            }

            let issue_id = issue.number.to_string();
            emit_candidate_found(commit.id.as_str(), self.name(), Some(&issue_id));
            report
                .candidates
                .push(BugFixCandidate::new(commit, Some(issue_id)));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed(commit: Option<&str>) -> IssueEvent {
        IssueEvent {
            event: "closed".to_string(),
            commit_id: commit.map(str::to_string),
            created_at: None,
        }
    }

    fn reopened() -> IssueEvent {
        IssueEvent {
            event: "reopened".to_string(),
            commit_id: None,
            created_at: None,
        }
    }

    #[test]
    fn test_single_close_is_selected_under_both_policies() {
        let events = vec![closed(Some("abc"))];
        for policy in [ClosingEventPolicy::First, ClosingEventPolicy::Last] {
            assert_eq!(
                select_closing_commit(&events, policy),
                Some(RevisionId::from("abc"))
            );
        }
    }

    #[test]
    fn test_reopened_issue_respects_policy() {
        let events = vec![closed(Some("first")), reopened(), closed(Some("second"))];
        assert_eq!(
            select_closing_commit(&events, ClosingEventPolicy::First),
            Some(RevisionId::from("first"))
        );
        assert_eq!(
            select_closing_commit(&events, ClosingEventPolicy::Last),
            Some(RevisionId::from("second"))
        );
    }

    #[test]
    fn test_manual_close_is_ignored() {
        let events = vec![closed(Some("abc")), reopened(), closed(None)];
        assert_eq!(
            select_closing_commit(&events, ClosingEventPolicy::Last),
            Some(RevisionId::from("abc"))
        );
        assert_eq!(select_closing_commit(&[closed(None)], ClosingEventPolicy::First), None);
        assert_eq!(select_closing_commit(&[], ClosingEventPolicy::Last), None);
    }

    #[test]
    fn test_event_deserializes_from_tracker_json() {
        let json = r#"{"event":"closed","commit_id":"deadbeef","created_at":"2024-01-02T03:04:05Z"}"#;
        let event: IssueEvent = serde_json::from_str(json).expect("deserialize");
        assert_eq!(event.commit_id.as_deref(), Some("deadbeef"));
        assert!(event.created_at.is_some());

        let json = r#"{"event":"labeled"}"#;
        let event: IssueEvent = serde_json::from_str(json).expect("deserialize");
        assert_eq!(event.commit_id, None);
    }
}
