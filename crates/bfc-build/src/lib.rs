//! BFC Build - build-and-test execution for candidate verification
//!
//! Provides the concrete build runner used by the harvester:
//! - Detects the project's build system (Maven, Gradle, Cargo)
//! - Executes the build as a child process under a timeout
//! - Folds every way a build can end into a `BuildReport`

pub mod error;
pub mod process;
pub mod runner;
pub mod stage;

// Re-export key types
pub use error::BuildError;
pub use process::{BuildConfig, ProcessBuildRunner};
pub use runner::{StageResult, StageRunner};
pub use stage::{BuildSystem, StageConfig};
