//! Results reported by a build-and-test run.

use serde::{Deserialize, Serialize};

/// How a build-and-test run ended.
///
/// Only `Passed` counts as a pass. `NoBuildSystem` and `Infrastructure`
/// are environment problems rather than test failures, and stay
/// distinguishable through [`BuildStatus::is_infrastructure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildStatus {
    Passed,
    Failed { exit_code: Option<i32> },
    TimedOut { timeout_secs: u64 },
    NoBuildSystem,
    Infrastructure { reason: String },
}

impl BuildStatus {
    pub fn passed(&self) -> bool {
        matches!(self, BuildStatus::Passed)
    }

    /// The runner itself could not execute the build.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            BuildStatus::NoBuildSystem | BuildStatus::Infrastructure { .. }
        )
    }

    /// Stable reason code for reports.
    pub fn reason_code(&self) -> &'static str {
        match self {
            BuildStatus::Passed => "passed",
            BuildStatus::Failed { .. } => "tests_failed",
            BuildStatus::TimedOut { .. } => "timed_out",
            BuildStatus::NoBuildSystem => "no_build_system",
            BuildStatus::Infrastructure { .. } => "build_infrastructure",
        }
    }
}

/// Result of one build-and-test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    #[serde(flatten)]
    pub status: BuildStatus,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Tail of the combined build output, for diagnostics.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_tail: String,
}

impl BuildReport {
    pub fn new(status: BuildStatus, duration_ms: u64) -> Self {
        Self {
            status,
            duration_ms,
            log_tail: String::new(),
        }
    }

    pub fn passed() -> Self {
        Self::new(BuildStatus::Passed, 0)
    }

    pub fn failed(exit_code: i32) -> Self {
        Self::new(
            BuildStatus::Failed {
                exit_code: Some(exit_code),
            },
            0,
        )
    }

    pub fn infrastructure(reason: impl Into<String>) -> Self {
        Self::new(
            BuildStatus::Infrastructure {
                reason: reason.into(),
            },
            0,
        )
    }

    pub fn with_log_tail(mut self, log_tail: impl Into<String>) -> Self {
        self.log_tail = log_tail.into();
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status.passed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_passed_counts_as_pass() {
        assert!(BuildStatus::Passed.passed());
        assert!(!BuildStatus::Failed { exit_code: Some(1) }.passed());
        assert!(!BuildStatus::TimedOut { timeout_secs: 5 }.passed());
        assert!(!BuildStatus::NoBuildSystem.passed());
        assert!(!BuildStatus::Infrastructure {
            reason: "mvn not found".to_string()
        }
        .passed());
    }

    #[test]
    fn test_infrastructure_is_distinguishable() {
        assert!(BuildStatus::NoBuildSystem.is_infrastructure());
        assert!(BuildReport::infrastructure("spawn failed").status.is_infrastructure());
        assert!(!BuildReport::failed(1).status.is_infrastructure());
        assert!(!BuildStatus::TimedOut { timeout_secs: 1 }.is_infrastructure());
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(BuildReport::passed().status.reason_code(), "passed");
        assert_eq!(BuildReport::failed(2).status.reason_code(), "tests_failed");
        assert_eq!(
            BuildReport::infrastructure("x").status.reason_code(),
            "build_infrastructure"
        );
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = BuildReport::new(BuildStatus::Failed { exit_code: Some(1) }, 1200);
        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["duration_ms"], 1200);
        assert!(value.get("log_tail").is_none());

        let back: BuildReport = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, report);
    }
}
