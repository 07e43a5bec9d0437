//! Harvest configuration.

use serde::{Deserialize, Serialize};

/// Which closing event of a reopened issue identifies the fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingEventPolicy {
    /// The earliest close that names a commit.
    First,
    /// The latest close that names a commit. A reopen means the earlier
    /// close did not fix the issue.
    #[default]
    Last,
}

impl std::str::FromStr for ClosingEventPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(ClosingEventPolicy::First),
            "last" => Ok(ClosingEventPolicy::Last),
            other => Err(format!("unknown closing event policy: {other}")),
        }
    }
}

/// Tunables for discovery and verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Lowercase substrings that mark a bug-fix message.
    pub keywords: Vec<String>,

    /// Upper bound (inclusive) on paths changed by a candidate.
    pub max_changed_files: usize,

    /// Directory segments that mark a path as test code, in addition to
    /// any path containing "test".
    pub test_dir_segments: Vec<String>,

    pub closing_event: ClosingEventPolicy,

    /// Independent working copies used for verification.
    pub workers: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            keywords: vec!["fix".to_string(), "bug".to_string(), "issue".to_string()],
            max_changed_files: 5,
            test_dir_segments: vec!["src/test".to_string()],
            closing_event: ClosingEventPolicy::default(),
            workers: 1,
        }
    }
}

impl HarvestConfig {
    pub fn with_max_changed_files(mut self, max: usize) -> Self {
        self.max_changed_files = max;
        self
    }

    pub fn with_closing_event(mut self, policy: ClosingEventPolicy) -> Self {
        self.closing_event = policy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
