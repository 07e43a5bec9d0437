//! Global atomic counters for harvest observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a harvest).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    commits_scanned: AtomicU64,
    candidates_found: AtomicU64,
    verifications_run: AtomicU64,
    verified: AtomicU64,
    aborted: AtomicU64,
    build_infrastructure_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            commits_scanned: AtomicU64::new(0),
            candidates_found: AtomicU64::new(0),
            verifications_run: AtomicU64::new(0),
            verified: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
            build_infrastructure_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_commits_scanned(&self) {
        self.commits_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_candidates_found(&self) {
        self.candidates_found.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "candidates_found", "counter incremented");
    }

    pub fn inc_verifications_run(&self) {
        self.verifications_run.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "verifications_run", "counter incremented");
    }

    pub fn inc_verified(&self) {
        self.verified.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "verified", "counter incremented");
    }

    pub fn inc_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "aborted", "counter incremented");
    }

    pub fn inc_build_infrastructure_failures(&self) {
        self.build_infrastructure_failures
            .fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "build_infrastructure_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a harvest, end of a
    /// verification batch) rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            commits_scanned = self.commits_scanned(),
            candidates_found = self.candidates_found(),
            verifications_run = self.verifications_run(),
            verified = self.verified(),
            aborted = self.aborted(),
            build_infrastructure_failures = self.build_infrastructure_failures(),
        );
    }

    pub fn commits_scanned(&self) -> u64 {
        self.commits_scanned.load(Ordering::Relaxed)
    }

    pub fn candidates_found(&self) -> u64 {
        self.candidates_found.load(Ordering::Relaxed)
    }

    pub fn verifications_run(&self) -> u64 {
        self.verifications_run.load(Ordering::Relaxed)
    }

    pub fn verified(&self) -> u64 {
        self.verified.load(Ordering::Relaxed)
    }

    pub fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn build_infrastructure_failures(&self) -> u64 {
        self.build_infrastructure_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.commits_scanned.store(0, Ordering::Relaxed);
        self.candidates_found.store(0, Ordering::Relaxed);
        self.verifications_run.store(0, Ordering::Relaxed);
        self.verified.store(0, Ordering::Relaxed);
        self.aborted.store(0, Ordering::Relaxed);
        self.build_infrastructure_failures
            .store(0, Ordering::Relaxed);
    }
}
