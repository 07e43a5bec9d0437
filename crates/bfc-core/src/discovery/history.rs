//! History-scan discovery: classify every commit reachable from any ref.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{CandidateSource, DiscoveryReport, SkippedReference};
use crate::classifier::{CommitClassifier, KeywordClassifier};
use crate::domain::{BugFixCandidate, Result};
use crate::issue_ref::extract_issue_id;
use crate::metrics::METRICS;
use crate::obs::emit_candidate_found;
use crate::snapshot::SnapshotProvider;

pub struct HistoryScan {
    classifier: Box<dyn CommitClassifier>,
}

impl Default for HistoryScan {
    fn default() -> Self {
        Self::new(Box::new(KeywordClassifier::default()))
    }
}

impl HistoryScan {
    pub fn new(classifier: Box<dyn CommitClassifier>) -> Self {
        Self { classifier }
    }

    /// Synchronous form of [`CandidateSource::discover`].
    pub fn scan(&self, repo: &dyn SnapshotProvider) -> Result<DiscoveryReport> {
        let mut report = DiscoveryReport::default();

        for id in repo.history()? {
            METRICS.inc_commits_scanned();
            let commit = match repo.commit(&id) {
                Ok(commit) => commit,
                Err(e) => {
                    warn!(commit = %id.short(), error = %e, "Skipping unreadable commit");
                    report
                        .skipped
                        .push(SkippedReference::new(id.as_str(), e.to_string()));
                    continue;
                }
            };

            if !self.classifier.classify(&commit) {
                continue;
            }

            let issue_id = extract_issue_id(&commit.message);
            emit_candidate_found(commit.id.as_str(), self.classifier.name(), issue_id.as_deref());
            report.candidates.push(BugFixCandidate::new(commit, issue_id));
        }

        info!(
            classifier = self.classifier.name(),
            candidates = report.candidates.len(),
            skipped = report.skipped.len(),
            "History scan complete"
        );
        Ok(report)
    }
}

#[async_trait]
impl CandidateSource for HistoryScan {
    fn name(&self) -> &str {
        "history"
    }

    async fn discover(&self, repo: &dyn SnapshotProvider) -> Result<DiscoveryReport> {
        self.scan(repo)
    }
}
