//! Multiplexer metric recording
//!
//! Thin helpers over the `metrics` facade. Without an installed recorder these
//! are no-ops.

use metrics::{counter, gauge, histogram};

/// Record an incoming batch
pub fn record_batch(jobs: usize, destinations: usize) {
    counter!("nova_cluster_batches_total").increment(1);
    counter!("nova_cluster_jobs_total").increment(jobs as u64);
    histogram!("nova_cluster_batch_jobs").record(jobs as f64);
    gauge!("nova_cluster_last_batch_destinations").set(destinations as f64);
}

/// Record a job whose view has no registered destination
pub fn record_unroutable(view: &str) {
    counter!(
        "nova_cluster_unroutable_jobs_total",
        "view" => view.to_string()
    )
    .increment(1);
}

/// Outcome label for a destination call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Unreachable,
    Timeout,
    Decode,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Unreachable => "unreachable",
            Self::Timeout => "timeout",
            Self::Decode => "decode",
        }
    }
}

/// Record one aggregated call to a render server
pub fn record_destination_call(destination: &str, status: CallStatus, latency_ms: f64) {
    counter!(
        "nova_cluster_destination_requests_total",
        "destination" => destination.to_string(),
        "status" => status.as_str()
    )
    .increment(1);

    histogram!(
        "nova_cluster_destination_latency_ms",
        "destination" => destination.to_string()
    )
    .record(latency_ms);
}

/// Record results synthesized because a destination omitted them
pub fn record_missing_results(destination: &str, count: usize) {
    if count > 0 {
        counter!(
            "nova_cluster_missing_results_total",
            "destination" => destination.to_string()
        )
        .increment(count as u64);
    }
}

/// Record end-to-end batch latency
pub fn record_batch_latency_ms(latency_ms: f64) {
    histogram!("nova_cluster_batch_latency_ms").record(latency_ms);
}
