//! Domain models for bug-fix harvesting.
//!
//! Canonical definitions for the core entities:
//! - `Commit`: Immutable commit metadata from the version-control backend
//! - `BugFixCandidate`: A commit selected by a discovery heuristic
//! - `TestChangeSet`: Test content isolated from a candidate
//! - `BuildReport`: Result of one build-and-test run
//! - `VerificationOutcome`: Terminal verdict for a candidate

pub mod build;
pub mod candidate;
pub mod commit;
pub mod error;
pub mod outcome;

// Re-export main types and errors
pub use build::{BuildReport, BuildStatus};
pub use candidate::{BugFixCandidate, TestChange, TestChangeSet};
pub use commit::{ChangeKind, ChangedPath, Commit, RevisionId};
pub use error::{BfcError, Result};
pub use outcome::{VerificationOutcome, VerificationStage, Verdict};
