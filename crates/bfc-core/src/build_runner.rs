//! Build runner trait.
//!
//! Implementations own build-system detection, process invocation and
//! timeouts. They never fail: every way a build can go wrong is folded
//! into the returned [`BuildReport`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::BuildReport;

/// Trait for build-and-test backends.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Build and test whatever is currently on disk under `working_copy`.
    async fn run(&self, working_copy: &Path) -> BuildReport;
}

#[async_trait]
impl<T: BuildRunner + ?Sized> BuildRunner for Arc<T> {
    async fn run(&self, working_copy: &Path) -> BuildReport {
        (**self).run(working_copy).await
    }
}
