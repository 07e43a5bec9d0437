//! BFC Tracker: issue-tracker access for issue-driven discovery
//!
//! Implements the core `IssueTracker` trait against the GitHub REST API:
//! closed issues labelled "bug" are listed through the search endpoint and
//! their lifecycle events fetched to find the commit that closed them.

pub mod error;
pub mod github;

pub use error::TrackerError;
pub use github::{repo_slug_from_url, GitHubClient, GitHubConfig};

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
