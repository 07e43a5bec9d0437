//! BFC Core Library
//!
//! Discovery and fail-then-pass verification of bug-fixing commits.

pub mod build_runner;
pub mod classifier;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod fakes;
pub mod git;
pub mod harvest;
pub mod isolator;
pub mod issue_ref;
pub mod metrics;
pub mod obs;
pub mod parallel;
pub mod reporting;
pub mod snapshot;
pub mod telemetry;
pub mod verification;

pub use build_runner::BuildRunner;
pub use classifier::{CommitClassifier, KeywordClassifier};
pub use config::{ClosingEventPolicy, HarvestConfig};
pub use discovery::{
    select_closing_commit, CandidateSource, DiscoveryReport, HistoryScan, IssueEvent,
    IssueEventDiscovery, IssueTracker, SkippedReference, TrackedIssue,
};
pub use domain::{
    BfcError, BugFixCandidate, BuildReport, BuildStatus, ChangeKind, ChangedPath, Commit, Result,
    RevisionId, TestChange, TestChangeSet, Verdict, VerificationOutcome, VerificationStage,
};
pub use git::{capture_head_sha, is_git_repo, repo_name_from_url, GitWorkingCopy};
pub use harvest::{HarvestReport, Harvester};
pub use isolator::{TestChangeIsolator, TestPathFilter};
pub use issue_ref::extract_issue_id;
pub use parallel::verify_parallel;
pub use reporting::{
    candidates_path, read_candidates_json, summary_path, verified_path, write_candidates_json,
    write_outcomes_json, write_summary_json, CandidateRecord, HarvestSummary, OutcomeRecord,
};
pub use snapshot::SnapshotProvider;
pub use verification::VerificationProtocol;

pub use metrics::METRICS;
pub use obs::{
    emit_candidate_found, emit_harvest_finished, emit_harvest_started, emit_verify_aborted,
    emit_verify_decided, emit_verify_started, harvest_span, verification_span, HarvestSpan,
};
pub use telemetry::init_tracing;

/// BFC version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
