//! Bug-fix commit classification.
//!
//! [`CommitClassifier`] is the seam for alternative heuristics; the
//! verification protocol never sees which classifier produced a candidate.

use crate::config::HarvestConfig;
use crate::domain::Commit;

/// Decides whether a commit is worth verifying as a bug fix.
pub trait CommitClassifier: Send + Sync {
    fn classify(&self, commit: &Commit) -> bool;

    fn name(&self) -> &str;
}

/// Message keywords plus a bound on the change footprint.
///
/// A commit qualifies when its lowercased message contains any keyword,
/// it has exactly one parent, and it changes at most `max_changed_files`
/// paths against that parent.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
    max_changed_files: usize,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::from_config(&HarvestConfig::default())
    }
}

impl KeywordClassifier {
    pub fn new(keywords: Vec<String>, max_changed_files: usize) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            max_changed_files,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.keywords.clone(), config.max_changed_files)
    }

    pub fn message_matches(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.keywords.iter().any(|k| message.contains(k.as_str()))
    }
}

impl CommitClassifier for KeywordClassifier {
    fn classify(&self, commit: &Commit) -> bool {
        self.message_matches(&commit.message)
            && commit.parent_ids.len() == 1
            && commit.changed_paths.len() <= self.max_changed_files
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
