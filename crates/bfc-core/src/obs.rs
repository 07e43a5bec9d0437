//! Structured observability hooks for harvest and verification lifecycle
//! events.
//!
//! This module provides:
//! - A verification-scoped span and a harvest-scoped `HarvestSpan` RAII guard
//! - Emission functions for key lifecycle events: harvest start/finish,
//!   candidate found, verification start/decision/abort
//!
//! Events are emitted at `info!` level; aborts at `warn!`.

use tracing::info;

use crate::domain::{VerificationOutcome, VerificationStage};
use crate::metrics::METRICS;

/// Span tagging every log line of one verification with its commit.
///
/// Attach it with [`tracing::Instrument`] so it stays valid across
/// `.await` points.
///
/// # Example
///
/// ```ignore
/// protocol.verify(&mut repo, &candidate)
///     .instrument(verification_span("9f2c1e0a"))
///     .await;
/// ```
pub fn verification_span(commit: &str) -> tracing::Span {
    tracing::info_span!("bfc.verify", commit = %commit)
}

/// Span tagging every log line of one harvest run.
pub fn harvest_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("bfc.harvest", run_id = %run_id)
}

/// RAII guard that enters a harvest-scoped tracing span for synchronous
/// sections such as discovery and report writing.
pub struct HarvestSpan {
    _span: tracing::span::EnteredSpan,
}

impl HarvestSpan {
    /// Create and enter a span tagged with the run id.
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: harvest_span(run_id).entered(),
        }
    }
}

/// Emit event: harvest started for a repository.
pub fn emit_harvest_started(run_id: &str, repo: &str, source: &str) {
    info!(event = "harvest.started", run_id = %run_id, repo = %repo, source = %source);
}

/// Emit event: harvest finished with aggregate counts.
pub fn emit_harvest_finished(run_id: &str, candidates: usize, verified: usize, aborted: usize) {
    info!(
        event = "harvest.finished",
        run_id = %run_id,
        candidates = candidates,
        verified = verified,
        aborted = aborted,
    );
}

/// Emit event: a discovery strategy produced a candidate.
pub fn emit_candidate_found(commit: &str, source: &str, issue_id: Option<&str>) {
    METRICS.inc_candidates_found();
    info!(
        event = "candidate.found",
        commit = %commit,
        source = %source,
        issue_id = issue_id.unwrap_or("-"),
    );
}

/// Emit event: verification of a candidate started.
pub fn emit_verify_started(commit: &str, parent: &str) {
    METRICS.inc_verifications_run();
    info!(event = "verify.started", commit = %commit, parent = %parent);
}

/// Emit event: verification reached a decision.
pub fn emit_verify_decided(outcome: &VerificationOutcome) {
    if outcome.verified {
        METRICS.inc_verified();
    }
    if outcome.hit_build_infrastructure() {
        METRICS.inc_build_infrastructure_failures();
    }
    info!(
        event = "verify.decided",
        commit = %outcome.candidate.commit.id,
        verified = outcome.verified,
        reason = outcome.verdict.reason_code(),
        parent_build = outcome.parent_build.as_ref().map(|b| b.status.reason_code()).unwrap_or("-"),
        fix_build = outcome.fix_build.as_ref().map(|b| b.status.reason_code()).unwrap_or("-"),
    );
}

/// Emit event: verification aborted on a working-copy error (warning level).
pub fn emit_verify_aborted(commit: &str, stage: VerificationStage, error: &dyn std::fmt::Display) {
    METRICS.inc_aborted();
    tracing::warn!(event = "verify.aborted", commit = %commit, stage = ?stage, error = %error);
}
