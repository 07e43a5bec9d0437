//! Build stage execution.

use crate::error::BuildError;
use crate::stage::StageConfig;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Result of a stage execution.
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit code (0 = success), `None` when killed by a signal.
    pub exit_code: Option<i32>,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl StageResult {
    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == Some(0)
    }

    /// Last `lines` lines of stdout followed by stderr.
    pub fn log_tail(&self, lines: usize) -> String {
        let combined: Vec<&str> = self.stdout.lines().chain(self.stderr.lines()).collect();
        let start = combined.len().saturating_sub(lines);
        combined[start..].join("\n")
    }
}

/// Stage runner that executes one build command as a child process.
pub struct StageRunner;

impl StageRunner {
    /// Execute a single stage and return the result.
    ///
    /// The child is killed when the timeout elapses.
    pub async fn execute_stage(config: &StageConfig) -> Result<StageResult, BuildError> {
        let start = Instant::now();

        let Some((exe, args)) = config.command.split_first() else {
            return Err(BuildError::EmptyCommand {
                stage: config.name.clone(),
            });
        };

        let mut command = Command::new(exe);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        debug!(stage = %config.name, command = ?config.command, "Spawning build");
        let child = command.spawn().map_err(|source| BuildError::Spawn {
            command: config.command.join(" "),
            source,
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = if config.timeout_secs > 0 {
            match tokio::time::timeout(
                Duration::from_secs(config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            {
                Ok(output) => output?,
                Err(_) => {
                    warn!(stage = %config.name, timeout_secs = config.timeout_secs, "Build timed out");
                    return Err(BuildError::Timeout {
                        stage: config.name.clone(),
                        timeout_secs: config.timeout_secs,
                    });
                }
            }
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        Ok(StageResult {
            stage_name: config.name.clone(),
            exit_code: output.status.code(),
            stdout,
            stderr,
            duration_ms,
            success: output.status.success(),
        })
    }
}
