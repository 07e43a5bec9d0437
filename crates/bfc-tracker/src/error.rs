//! Error types for bfc-tracker

use thiserror::Error;

/// Errors that can occur while talking to the issue tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Repository URL is not a recognised GitHub repository
    #[error("not a GitHub repository: {0}")]
    InvalidRepository(String),

    /// Request could not be sent or the response not read
    #[error("HTTP error: {0}")]
    Http(String),

    /// Tracker answered with a non-success status
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Http(err.to_string())
    }
}

impl From<TrackerError> for bfc_core::BfcError {
    fn from(err: TrackerError) -> Self {
        bfc_core::BfcError::Tracker(err.to_string())
    }
}
