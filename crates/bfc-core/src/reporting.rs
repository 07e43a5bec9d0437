use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BugFixCandidate, RevisionId, VerificationOutcome};
use crate::harvest::HarvestReport;
use crate::snapshot::SnapshotProvider;

/// One discovered candidate in `<repo>_bfcs.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateRecord {
    pub commit_hash: String,
    pub commit_message: String,
    pub issue_id: Option<String>,
}

impl From<&BugFixCandidate> for CandidateRecord {
    fn from(candidate: &BugFixCandidate) -> Self {
        Self {
            commit_hash: candidate.commit.id.as_str().to_string(),
            commit_message: candidate.commit.message.clone(),
            issue_id: candidate.issue_id.clone(),
        }
    }
}

impl CandidateRecord {
    /// Reload the full commit from `repo`.
    pub fn resolve(&self, repo: &dyn SnapshotProvider) -> crate::domain::Result<BugFixCandidate> {
        let commit = repo.commit(&RevisionId::from(self.commit_hash.as_str()))?;
        Ok(BugFixCandidate::new(commit, self.issue_id.clone()))
    }
}

/// One verification outcome in `<repo>_verified.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub commit_hash: String,
    pub issue_id: Option<String>,
    pub verified: bool,
    pub reason: String,
    pub parent_build: Option<String>,
    pub fix_build: Option<String>,
    /// A build could not run at all; `verified` is then not evidence.
    pub build_infrastructure: bool,
    pub test_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&VerificationOutcome> for OutcomeRecord {
    fn from(outcome: &VerificationOutcome) -> Self {
        use crate::domain::Verdict;

        let detail = match &outcome.verdict {
            Verdict::Aborted { error, .. } => Some(error.clone()),
            Verdict::ParentUnresolved { detail } => Some(detail.clone()),
            _ => None,
        };
        Self {
            commit_hash: outcome.candidate.commit.id.as_str().to_string(),
            issue_id: outcome.candidate.issue_id.clone(),
            verified: outcome.verified,
            reason: outcome.verdict.reason_code().to_string(),
            parent_build: outcome
                .parent_build
                .as_ref()
                .map(|b| b.status.reason_code().to_string()),
            fix_build: outcome
                .fix_build
                .as_ref()
                .map(|b| b.status.reason_code().to_string()),
            build_infrastructure: outcome.hit_build_infrastructure(),
            test_paths: outcome.test_paths.clone(),
            detail,
        }
    }
}

/// Aggregate counts of one harvest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarvestSummary {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub repository: String,
    pub run_id: String,
    pub candidates: usize,
    pub verified: usize,
    pub unverified: std::collections::BTreeMap<String, usize>,
    pub aborted: usize,
    pub build_infrastructure_failures: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_error: Option<String>,
}

impl HarvestSummary {
    pub fn from_report(repository: &str, report: &HarvestReport) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            generated_at: Utc::now(),
            repository: repository.to_string(),
            run_id: report.run_id.clone(),
            candidates: report.total(),
            verified: report.verified,
            unverified: report.unverified.clone(),
            aborted: report.aborted,
            build_infrastructure_failures: report.build_infrastructure_failures,
            restore_error: report.restore_error.clone(),
        }
    }
}

pub fn candidates_path(out_dir: &Path, repo_name: &str) -> PathBuf {
    out_dir.join(format!("{repo_name}_bfcs.json"))
}

pub fn verified_path(out_dir: &Path, repo_name: &str) -> PathBuf {
    out_dir.join(format!("{repo_name}_verified.json"))
}

pub fn summary_path(out_dir: &Path, repo_name: &str) -> PathBuf {
    out_dir.join(format!("{repo_name}_summary.json"))
}

fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let content = serde_json::to_string_pretty(value).context("serialize report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Write `<repo>_bfcs.json` in pretty JSON format.
pub fn write_candidates_json(path: &Path, candidates: &[BugFixCandidate]) -> Result<()> {
    let records: Vec<CandidateRecord> = candidates.iter().map(CandidateRecord::from).collect();
    write_pretty(path, &records)
}

/// Read a candidates file written by [`write_candidates_json`].
pub fn read_candidates_json(path: &Path) -> Result<Vec<CandidateRecord>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parse {:?}", path))
}

/// Write `<repo>_verified.json`: one record per outcome, verified or not.
pub fn write_outcomes_json(path: &Path, outcomes: &[VerificationOutcome]) -> Result<()> {
    let records: Vec<OutcomeRecord> = outcomes.iter().map(OutcomeRecord::from).collect();
    write_pretty(path, &records)
}

pub fn write_summary_json(path: &Path, summary: &HarvestSummary) -> Result<()> {
    write_pretty(path, summary)
}
