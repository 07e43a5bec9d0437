//! Fail-then-pass verification of a single candidate.
//!
//! The protocol builds a counterfactual snapshot (parent revision's
//! production code plus the fix revision's test code), builds it, then
//! builds the fix revision itself. A candidate is verified only when the
//! counterfactual fails and the fix passes.
//!
//! The working copy is borrowed mutably for the whole run, so a second
//! verification cannot touch it until this one has decided.

use tracing::{debug, error, Instrument};

use crate::build_runner::BuildRunner;
use crate::domain::{
    BfcError, BugFixCandidate, BuildReport, TestChangeSet, VerificationOutcome,
    VerificationStage, Verdict,
};
use crate::isolator::TestChangeIsolator;
use crate::obs::{emit_verify_aborted, emit_verify_decided, emit_verify_started, verification_span};
use crate::snapshot::SnapshotProvider;

pub struct VerificationProtocol<B> {
    runner: B,
    isolator: TestChangeIsolator,
}

impl<B: BuildRunner> VerificationProtocol<B> {
    pub fn new(runner: B) -> Self {
        Self {
            runner,
            isolator: TestChangeIsolator::default(),
        }
    }

    pub fn with_isolator(mut self, isolator: TestChangeIsolator) -> Self {
        self.isolator = isolator;
        self
    }

    pub fn runner(&self) -> &B {
        &self.runner
    }

    /// Decide whether `candidate` is a verified bug fix.
    ///
    /// Never fails: working-copy errors become [`Verdict::Aborted`] with
    /// the error text, and the working copy is put back on the fix
    /// revision before returning.
    pub async fn verify<R>(&self, repo: &mut R, candidate: &BugFixCandidate) -> VerificationOutcome
    where
        R: SnapshotProvider + ?Sized,
    {
        let span = verification_span(candidate.commit.id.short());
        let outcome = self.run_protocol(repo, candidate).instrument(span).await;
        emit_verify_decided(&outcome);
        outcome
    }

    async fn run_protocol<R>(&self, repo: &mut R, candidate: &BugFixCandidate) -> VerificationOutcome
    where
        R: SnapshotProvider + ?Sized,
    {
        let commit = &candidate.commit;
        let mut stage = VerificationStage::Init;

        match commit.parent_ids.len() {
            0 => return VerificationOutcome::early(candidate.clone(), Verdict::RootCommit),
            1 => {}
            parents => {
                return VerificationOutcome::early(
                    candidate.clone(),
                    Verdict::MergeCommit { parents },
                )
            }
        }

        let parent = match repo.resolve_parent(&commit.id) {
            Ok(Some(parent)) => parent,
            Ok(None) => return VerificationOutcome::early(candidate.clone(), Verdict::RootCommit),
            Err(e) => {
                return VerificationOutcome::early(
                    candidate.clone(),
                    Verdict::ParentUnresolved {
                        detail: e.to_string(),
                    },
                )
            }
        };
        advance(&mut stage, VerificationStage::ParentResolved);
        emit_verify_started(commit.id.as_str(), parent.id.as_str());

        let tests = match self.isolator.isolate(&*repo, commit, &parent) {
            Ok(tests) => tests,
            Err(e) => return self.abort(repo, candidate, stage, e, Vec::new(), None),
        };
        if tests.is_empty() {
            return VerificationOutcome::early(candidate.clone(), Verdict::NoTestChanges);
        }
        advance(&mut stage, VerificationStage::TestsIsolated);
        let test_paths = tests.paths();

        if let Err(e) = repo.checkout(&parent.id) {
            return self.abort(repo, candidate, stage, e, test_paths, None);
        }
        advance(&mut stage, VerificationStage::ParentCheckedOut);

        if let Err(e) = overlay_tests(repo, &tests) {
            return self.abort(repo, candidate, stage, e, test_paths, None);
        }
        advance(&mut stage, VerificationStage::ParentOverlaid);

        let parent_build = self.runner.run(repo.root()).await;
        advance(&mut stage, VerificationStage::ParentBuilt);

        if let Err(e) = repo.checkout(&commit.id) {
            return self.abort(repo, candidate, stage, e, test_paths, Some(parent_build));
        }
        advance(&mut stage, VerificationStage::FixCheckedOut);

        let fix_build = self.runner.run(repo.root()).await;
        advance(&mut stage, VerificationStage::FixBuilt);

        let outcome =
            VerificationOutcome::decide(candidate.clone(), test_paths, parent_build, fix_build);
        advance(&mut stage, VerificationStage::Decided);
        outcome
    }

    /// Record a failed run and move the working copy back to the fix
    /// revision, the one revision known to exist.
    fn abort<R>(
        &self,
        repo: &mut R,
        candidate: &BugFixCandidate,
        stage: VerificationStage,
        err: BfcError,
        test_paths: Vec<String>,
        parent_build: Option<BuildReport>,
    ) -> VerificationOutcome
    where
        R: SnapshotProvider + ?Sized,
    {
        let commit = &candidate.commit;
        emit_verify_aborted(commit.id.as_str(), stage, &err);

        if stage >= VerificationStage::TestsIsolated {
            if let Err(cleanup) = repo.checkout(&commit.id) {
                error!(
                    commit = %commit.id.short(),
                    error = %cleanup,
                    "Could not restore working copy after abort"
                );
            }
        }

        VerificationOutcome {
            candidate: candidate.clone(),
            verified: false,
            verdict: Verdict::Aborted {
                stage,
                error: err.to_string(),
            },
            test_paths,
            parent_build,
            fix_build: None,
        }
    }
}

/// Write every test change onto the working copy.
fn overlay_tests<R>(repo: &mut R, tests: &TestChangeSet) -> Result<(), BfcError>
where
    R: SnapshotProvider + ?Sized,
{
    for change in tests {
        debug!(path = %change.path, digest = %change.digest(), "Overlaying test file");
        repo.overlay(&change.path, &change.content)?;
    }
    Ok(())
}

fn advance(stage: &mut VerificationStage, next: VerificationStage) {
    debug!(from = ?*stage, to = ?next, "Verification stage");
    *stage = next;
}
