//! Sequential harvest loop over one working copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::build_runner::BuildRunner;
use crate::domain::{BugFixCandidate, Result, VerificationOutcome};
use crate::obs::{emit_harvest_finished, harvest_span};
use crate::snapshot::SnapshotProvider;
use crate::verification::VerificationProtocol;

/// Outcomes of one harvest run with aggregate counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub run_id: String,
    pub outcomes: Vec<VerificationOutcome>,
    pub verified: usize,
    /// Unverified outcomes keyed by verdict reason code.
    pub unverified: BTreeMap<String, usize>,
    pub aborted: usize,
    pub build_infrastructure_failures: usize,
    /// Set when the working copy could not be put back on its starting
    /// revision after the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_error: Option<String>,
}

impl HarvestReport {
    pub fn from_outcomes(run_id: impl Into<String>, outcomes: Vec<VerificationOutcome>) -> Self {
        let mut report = Self {
            run_id: run_id.into(),
            outcomes: Vec::new(),
            verified: 0,
            unverified: BTreeMap::new(),
            aborted: 0,
            build_infrastructure_failures: 0,
            restore_error: None,
        };
        for outcome in outcomes {
            report.record(outcome);
        }
        report
    }

    fn record(&mut self, outcome: VerificationOutcome) {
        if outcome.verified {
            self.verified += 1;
        } else {
            *self
                .unverified
                .entry(outcome.verdict.reason_code().to_string())
                .or_default() += 1;
        }
        if outcome.is_aborted() {
            self.aborted += 1;
        }
        if outcome.hit_build_infrastructure() {
            self.build_infrastructure_failures += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn verified_outcomes(&self) -> impl Iterator<Item = &VerificationOutcome> {
        self.outcomes.iter().filter(|o| o.verified)
    }
}

/// Runs the verification protocol over a list of candidates, one at a
/// time, on a single working copy.
pub struct Harvester<B> {
    protocol: VerificationProtocol<B>,
}

impl<B: BuildRunner> Harvester<B> {
    pub fn new(protocol: VerificationProtocol<B>) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> &VerificationProtocol<B> {
        &self.protocol
    }

    /// Verify every candidate in order.
    ///
    /// Individual failures end up in the report. The working copy is put
    /// back on the revision it started at; a failed restore is recorded in
    /// [`HarvestReport::restore_error`]. Failing to read the starting
    /// revision, before any candidate ran, is the only error.
    pub async fn verify_all<R>(
        &self,
        repo: &mut R,
        candidates: &[BugFixCandidate],
    ) -> Result<HarvestReport>
    where
        R: SnapshotProvider + ?Sized,
    {
        let run_id = Uuid::new_v4().to_string();
        let span = harvest_span(&run_id);
        let start = repo.head()?;

        let outcomes = async {
            info!(candidates = candidates.len(), start = %start.short(), "Verifying candidates");
            let mut outcomes = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                outcomes.push(self.protocol.verify(repo, candidate).await);
            }
            outcomes
        }
        .instrument(span)
        .await;

        let mut report = HarvestReport::from_outcomes(run_id, outcomes);
        if let Err(e) = repo.checkout(&start) {
            warn!(revision = %start.short(), error = %e, "Could not restore starting revision");
            report.restore_error = Some(e.to_string());
        }

        emit_harvest_finished(
            &report.run_id,
            report.total(),
            report.verified,
            report.aborted,
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BuildReport, RevisionId, Verdict};
    use crate::fakes::{MemoryRepository, ScriptedBuildRunner};

    fn repo() -> (MemoryRepository, Vec<BugFixCandidate>) {
        let mut repo = MemoryRepository::new();
        repo.add_commit("a", "init", &[], &[("src/lib.rs", "v1")]);
        let fix = repo.add_commit(
            "b",
            "fix #3",
            &["a"],
            &[("src/lib.rs", "v2"), ("tests/lib_test.rs", "t")],
        );
        let no_tests = repo.add_commit(
            "c",
            "fix typo",
            &["b"],
            &[("src/lib.rs", "v3"), ("tests/lib_test.rs", "t")],
        );
        repo.add_commit(
            "d",
            "docs",
            &["c"],
            &[("src/lib.rs", "v3"), ("tests/lib_test.rs", "t"), ("README", "r")],
        );
        repo.checkout(&RevisionId::from("d")).unwrap();
        let candidates = vec![
            BugFixCandidate::new(fix, Some("3".to_string())),
            BugFixCandidate::new(no_tests, None),
        ];
        (repo, candidates)
    }

    #[tokio::test]
    async fn test_verify_all_aggregates_and_restores_head() {
        let (mut repo, candidates) = repo();
        let runner = ScriptedBuildRunner::new(vec![BuildReport::failed(1), BuildReport::passed()]);
        let harvester = Harvester::new(VerificationProtocol::new(runner));

        let report = harvester.verify_all(&mut repo, &candidates).await.unwrap();
        assert_eq!(report.total(), 2);
        assert_eq!(report.verified, 1);
        assert_eq!(report.unverified.get("no_test_changes"), Some(&1));
        assert_eq!(report.aborted, 0);
        assert_eq!(report.outcomes[1].verdict, Verdict::NoTestChanges);
        assert_eq!(repo.head().unwrap(), RevisionId::from("d"));
        assert!(report.restore_error.is_none());

        let verified: Vec<_> = report
            .verified_outcomes()
            .map(|o| o.candidate.commit.id.as_str())
            .collect();
        assert_eq!(verified, vec!["b"]);
    }

    #[tokio::test]
    async fn test_failed_restore_keeps_outcomes() {
        let (mut repo, candidates) = repo();
        repo.fail_checkout_of("d");
        let runner = ScriptedBuildRunner::new(vec![BuildReport::failed(1), BuildReport::passed()]);
        let harvester = Harvester::new(VerificationProtocol::new(runner));

        let report = harvester
            .verify_all(&mut repo, &candidates[..1])
            .await
            .unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.verified, 1);
        let error = report.restore_error.as_deref().unwrap();
        assert!(error.contains("checkout of d failed"), "{error}");
    }

    #[tokio::test]
    async fn test_outcomes_follow_candidate_order() {
        let (mut repo, mut candidates) = repo();
        candidates.reverse();
        let runner = ScriptedBuildRunner::new(vec![BuildReport::failed(1), BuildReport::passed()]);
        let harvester = Harvester::new(VerificationProtocol::new(runner));

        let report = harvester.verify_all(&mut repo, &candidates).await.unwrap();
        let ids: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| o.candidate.commit.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_report_counts_infrastructure_failures() {
        let (_, candidates) = repo();
        let outcome = VerificationOutcome::decide(
            candidates[0].clone(),
            vec!["tests/lib_test.rs".to_string()],
            BuildReport::infrastructure("spawn failed"),
            BuildReport::passed(),
        );
        let report = HarvestReport::from_outcomes("run", vec![outcome]);
        assert_eq!(report.verified, 1);
        assert_eq!(report.build_infrastructure_failures, 1);
    }
}
