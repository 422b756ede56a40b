//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared by the dispatcher and its workers
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Total `submit` calls (monotonic, never decremented)
    submitted: AtomicU64,
    /// Submissions refused because shutdown had begun
    rejected: AtomicU64,
    /// Pages written and attached successfully
    written: AtomicU64,
    /// Pages dropped after a failure
    failed: AtomicU64,
    /// Workers currently running a page
    active: AtomicUsize,
    /// Highest value `active` ever reached
    peak_active: AtomicUsize,
}

impl DispatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total submit count
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Increment submit count
    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get successful write count
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Increment successful write count
    pub fn inc_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get number of workers currently running a page
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Get the highest concurrent worker count observed
    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    /// Mark a worker as busy
    pub(crate) fn worker_busy(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
    }

    /// Mark a worker as done with its page
    pub(crate) fn worker_done(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted(),
            rejected: self.rejected(),
            written: self.written(),
            failed: self.failed(),
            active: self.active(),
            peak_active: self.peak_active(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub rejected: u64,
    pub written: u64,
    pub failed: u64,
    pub active: usize,
    pub peak_active: usize,
}

impl MetricsSnapshot {
    /// Pages whose outcome is known
    pub fn completed(&self) -> u64 {
        self.written + self.failed
    }
}
