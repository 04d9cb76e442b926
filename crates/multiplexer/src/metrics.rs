//! Dispatch counters for reporting

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide dispatch counters
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Batches rendered
    batches: AtomicU64,
    /// Jobs received across all batches
    jobs: AtomicU64,
    /// Jobs failed with ReferenceError
    unroutable: AtomicU64,
    /// Aggregated destination requests issued
    destination_requests: AtomicU64,
    /// Destination requests that degraded to synthesized failures
    destination_failures: AtomicU64,
    /// Results synthesized for ids a destination omitted
    missing_results: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_batch(&self, jobs: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.jobs.fetch_add(jobs as u64, Ordering::Relaxed);
    }

    pub fn add_unroutable(&self, count: usize) {
        self.unroutable.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn inc_destination_requests(&self) {
        self.destination_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_destination_failures(&self) {
        self.destination_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_missing_results(&self, count: usize) {
        self.missing_results.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn destination_requests(&self) -> u64 {
        self.destination_requests.load(Ordering::Relaxed)
    }

    pub fn destination_failures(&self) -> u64 {
        self.destination_failures.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches: self.batches(),
            jobs: self.jobs.load(Ordering::Relaxed),
            unroutable: self.unroutable.load(Ordering::Relaxed),
            destination_requests: self.destination_requests(),
            destination_failures: self.destination_failures(),
            missing_results: self.missing_results.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub batches: u64,
    pub jobs: u64,
    pub unroutable: u64,
    pub destination_requests: u64,
    pub destination_failures: u64,
    pub missing_results: u64,
}
