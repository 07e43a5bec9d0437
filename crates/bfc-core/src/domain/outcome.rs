//! Verification outcomes and the state machine they are decided in.

use serde::{Deserialize, Serialize};

use super::build::BuildReport;
use super::candidate::BugFixCandidate;

/// States of a single verification run, in order.
///
/// Early exits jump straight to `Decided` from `Init` (root or merge
/// commit, unresolvable parent) and from `ParentResolved` (no test
/// changes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStage {
    Init,
    ParentResolved,
    TestsIsolated,
    ParentCheckedOut,
    ParentOverlaid,
    ParentBuilt,
    FixCheckedOut,
    FixBuilt,
    Decided,
}

/// Why a candidate ended up verified or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Counterfactual failed, fix passed.
    Verified,
    RootCommit,
    MergeCommit { parents: usize },
    ParentUnresolved { detail: String },
    NoTestChanges,
    /// The fix's tests already pass against the pre-fix code.
    PassedBeforeFix,
    /// The fix revision does not pass its own build.
    FixBuildFailed,
    /// A repository operation failed. `stage` is the last state reached
    /// before the failure; the working copy was restored to the fix
    /// revision if it had been touched.
    Aborted {
        stage: VerificationStage,
        error: String,
    },
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified)
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Verdict::Verified => "verified",
            Verdict::RootCommit => "root_commit",
            Verdict::MergeCommit { .. } => "merge_commit",
            Verdict::ParentUnresolved { .. } => "parent_unresolved",
            Verdict::NoTestChanges => "no_test_changes",
            Verdict::PassedBeforeFix => "passed_before_fix",
            Verdict::FixBuildFailed => "fix_build_failed",
            Verdict::Aborted { .. } => "aborted",
        }
    }
}

/// Terminal artifact of one verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub candidate: BugFixCandidate,
    pub verified: bool,
    pub verdict: Verdict,
    /// Paths overlaid onto the counterfactual snapshot.
    #[serde(default)]
    pub test_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_build: Option<BuildReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_build: Option<BuildReport>,
}

impl VerificationOutcome {
    /// An outcome decided before any build ran.
    pub fn early(candidate: BugFixCandidate, verdict: Verdict) -> Self {
        Self {
            candidate,
            verified: verdict.is_verified(),
            verdict,
            test_paths: Vec::new(),
            parent_build: None,
            fix_build: None,
        }
    }

    /// Decide from the two build results.
    ///
    /// A build that could not run counts as a failing one here; callers
    /// tell the two apart through [`Self::hit_build_infrastructure`]. A
    /// failing fix build takes precedence over a passing counterfactual in
    /// the verdict.
    pub fn decide(
        candidate: BugFixCandidate,
        test_paths: Vec<String>,
        parent_build: BuildReport,
        fix_build: BuildReport,
    ) -> Self {
        let verdict = if !fix_build.is_pass() {
            Verdict::FixBuildFailed
        } else if parent_build.is_pass() {
            Verdict::PassedBeforeFix
        } else {
            Verdict::Verified
        };
        Self {
            candidate,
            verified: verdict.is_verified(),
            verdict,
            test_paths,
            parent_build: Some(parent_build),
            fix_build: Some(fix_build),
        }
    }

    /// Whether either build could not run at all, as opposed to running
    /// and failing.
    pub fn hit_build_infrastructure(&self) -> bool {
        self.parent_build
            .iter()
            .chain(self.fix_build.iter())
            .any(|b| b.status.is_infrastructure())
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.verdict, Verdict::Aborted { .. })
    }
}
