//! Domain-level error taxonomy for bug-fix harvesting.

use std::path::PathBuf;

/// Harvesting and verification errors.
///
/// None of these are retried. A failed build is a data outcome and is
/// reported through [`crate::BuildStatus`], never through this type.
#[derive(Debug, thiserror::Error)]
pub enum BfcError {
    /// A revision or issue reference could not be resolved.
    #[error("cannot resolve {reference}: {detail}")]
    Resolution { reference: String, detail: String },

    /// The working copy could not be moved to the requested revision.
    #[error("checkout of {revision} failed: {detail}")]
    Checkout { revision: String, detail: String },

    /// Test content could not be written onto the working copy.
    #[error("overlay of {path:?} failed: {detail}")]
    Overlay { path: PathBuf, detail: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("issue tracker error: {0}")]
    Tracker(String),

    /// A parallel verification worker died before reporting.
    #[error("verification worker failed: {0}")]
    Worker(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BfcError {
    pub fn resolution(reference: impl Into<String>, detail: impl Into<String>) -> Self {
        BfcError::Resolution {
            reference: reference.into(),
            detail: detail.into(),
        }
    }

    pub fn checkout(revision: impl Into<String>, detail: impl Into<String>) -> Self {
        BfcError::Checkout {
            revision: revision.into(),
            detail: detail.into(),
        }
    }

    pub fn overlay(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        BfcError::Overlay {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for harvesting operations.
pub type Result<T> = std::result::Result<T, BfcError>;
