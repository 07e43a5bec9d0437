//! `BuildRunner` backed by child processes.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use bfc_core::{BuildReport, BuildRunner, BuildStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::BuildError;
use crate::runner::StageRunner;
use crate::stage::{BuildSystem, StageConfig};

/// Build runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Per-build timeout in seconds; 0 disables it.
    pub timeout_secs: u64,

    /// Explicit command, bypassing build-system detection.
    pub command: Option<Vec<String>>,

    /// Use a checked-in Gradle wrapper when present.
    pub prefer_wrapper: bool,

    /// Output lines kept in each report.
    pub log_tail_lines: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 1800,
            command: None,
            prefer_wrapper: true,
            log_tail_lines: 40,
        }
    }
}

impl BuildConfig {
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Override detection with a whitespace-separated command line.
    pub fn with_command_line(mut self, command_line: &str) -> Self {
        let command: Vec<String> = command_line.split_whitespace().map(str::to_string).collect();
        self.command = (!command.is_empty()).then_some(command);
        self
    }
}

/// Runs the project's own build in the working copy.
#[derive(Debug, Clone, Default)]
pub struct ProcessBuildRunner {
    config: BuildConfig,
}

impl ProcessBuildRunner {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Stage to run for `working_copy`, or `None` when nothing can build it.
    pub fn stage_for(&self, working_copy: &Path) -> Option<StageConfig> {
        if let Some(command) = &self.config.command {
            return Some(
                StageConfig::custom("custom".to_string(), command.clone(), self.config.timeout_secs)
                    .in_dir(working_copy),
            );
        }
        BuildSystem::detect(working_copy, self.config.prefer_wrapper).map(|system| {
            StageConfig::from_build_system(system, working_copy, self.config.timeout_secs)
        })
    }
}

#[async_trait]
impl BuildRunner for ProcessBuildRunner {
    async fn run(&self, working_copy: &Path) -> BuildReport {
        let start = Instant::now();

        let Some(stage) = self.stage_for(working_copy) else {
            warn!(path = %working_copy.display(), "No recognised build system");
            return BuildReport::new(BuildStatus::NoBuildSystem, 0);
        };

        let result = StageRunner::execute_stage(&stage).await;
        let elapsed = start.elapsed().as_millis() as u64;

        let report = match result {
            Ok(result) if result.passed() => {
                BuildReport::new(BuildStatus::Passed, result.duration_ms)
                    .with_log_tail(result.log_tail(self.config.log_tail_lines))
            }
            Ok(result) => BuildReport::new(
                BuildStatus::Failed {
                    exit_code: result.exit_code,
                },
                result.duration_ms,
            )
            .with_log_tail(result.log_tail(self.config.log_tail_lines)),
            Err(BuildError::Timeout { timeout_secs, .. }) => {
                BuildReport::new(BuildStatus::TimedOut { timeout_secs }, elapsed)
            }
            Err(e) => BuildReport::new(
                BuildStatus::Infrastructure {
                    reason: e.to_string(),
                },
                elapsed,
            ),
        };

        info!(
            stage = %stage.name,
            status = report.status.reason_code(),
            duration_ms = report.duration_ms,
            "Build finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert_eq!(config.timeout_secs, 1800);
        assert!(config.command.is_none());
        assert!(config.prefer_wrapper);
    }

    #[test]
    fn test_command_line_override() {
        let config = BuildConfig::default().with_command_line("  mvn -q   test ");
        assert_eq!(
            config.command,
            Some(vec!["mvn".to_string(), "-q".to_string(), "test".to_string()])
        );
        assert!(BuildConfig::default().with_command_line("   ").command.is_none());
    }

    #[test]
    fn test_stage_for_uses_override_before_detection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "").unwrap();

        let detected = ProcessBuildRunner::default().stage_for(dir.path()).unwrap();
        assert_eq!(detected.name, "maven");

        let runner = ProcessBuildRunner::new(BuildConfig::default().with_command_line("make check"));
        let custom = runner.stage_for(dir.path()).unwrap();
        assert_eq!(custom.command, vec!["make", "check"]);
        assert_eq!(custom.working_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_stage_for_empty_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProcessBuildRunner::default().stage_for(dir.path()).is_none());
    }
}
