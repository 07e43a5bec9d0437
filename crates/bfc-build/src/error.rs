//! Build execution errors.

/// Errors raised while executing a build stage.
///
/// These never cross into the core: [`crate::ProcessBuildRunner`] turns
/// each of them into a `BuildStatus`.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("stage {stage} has an empty command")]
    EmptyCommand { stage: String },

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stage {stage} timed out after {timeout_secs} seconds")]
    Timeout { stage: String, timeout_secs: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
