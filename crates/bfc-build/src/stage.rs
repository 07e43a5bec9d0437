//! Build-system detection and stage configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Build systems recognised in a working copy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildSystem {
    /// mvn clean install
    Maven,

    /// ./gradlew build, or gradle build without a wrapper
    Gradle { wrapper: bool },

    /// cargo test
    Cargo,
}

impl BuildSystem {
    /// Detect the build system from marker files at `root`.
    ///
    /// Maven wins over Gradle, Gradle over Cargo. `prefer_wrapper` uses a
    /// checked-in `gradlew` when there is one.
    pub fn detect(root: &Path, prefer_wrapper: bool) -> Option<Self> {
        if root.join("pom.xml").is_file() {
            return Some(BuildSystem::Maven);
        }
        if root.join("build.gradle").is_file() || root.join("build.gradle.kts").is_file() {
            let wrapper = prefer_wrapper && root.join("gradlew").is_file();
            return Some(BuildSystem::Gradle { wrapper });
        }
        if root.join("Cargo.toml").is_file() {
            return Some(BuildSystem::Cargo);
        }
        None
    }

    /// Get the build system name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuildSystem::Maven => "maven",
            BuildSystem::Gradle { .. } => "gradle",
            BuildSystem::Cargo => "cargo",
        }
    }

    /// Build-and-test command for a working copy at `root`.
    pub fn command(&self, root: &Path) -> Vec<String> {
        match self {
            BuildSystem::Maven => vec!["mvn".to_string(), "clean".to_string(), "install".to_string()],
            BuildSystem::Gradle { wrapper: true } => vec![
                root.join("gradlew").to_string_lossy().to_string(),
                "build".to_string(),
            ],
            BuildSystem::Gradle { wrapper: false } => {
                vec!["gradle".to_string(), "build".to_string()]
            }
            BuildSystem::Cargo => vec!["cargo".to_string(), "test".to_string()],
        }
    }
}

/// Configuration for one build stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Human-readable stage name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Timeout in seconds; 0 disables it.
    pub timeout_secs: u64,

    /// Directory the command runs in.
    pub working_dir: Option<PathBuf>,
}

impl StageConfig {
    /// Stage running the detected build system's command inside `root`.
    pub fn from_build_system(system: BuildSystem, root: &Path, timeout_secs: u64) -> Self {
        Self {
            name: system.name().to_string(),
            command: system.command(root),
            timeout_secs,
            working_dir: Some(root.to_path_buf()),
        }
    }

    /// Create a custom stage configuration.
    pub fn custom(name: String, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            command,
            timeout_secs,
            working_dir: None,
        }
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }
}
