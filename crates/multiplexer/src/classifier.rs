//! Classifier - partitions a batch by destination

use std::collections::HashMap;

use contracts::{BatchRequest, Destination, JobId, Registry, ViewJobResult};
use tracing::debug;

/// Output of [`classify`]
///
/// Every job of the input lands in exactly one of `sub_batches` or `failures`.
#[derive(Debug, Default)]
pub struct Classified {
    /// Routable jobs grouped by resolved destination
    pub sub_batches: HashMap<Destination, BatchRequest>,
    /// ReferenceError results for unroutable jobs
    pub failures: HashMap<JobId, ViewJobResult>,
}

impl Classified {
    /// Number of jobs that will be dispatched
    pub fn routed_jobs(&self) -> usize {
        self.sub_batches.values().map(HashMap::len).sum()
    }

    /// Number of distinct destinations referenced
    pub fn destination_count(&self) -> usize {
        self.sub_batches.len()
    }
}

/// Group `batch` by destination, failing jobs with no registered server
pub fn classify(batch: BatchRequest, registry: &Registry) -> Classified {
    let mut classified = Classified::default();

    for (id, job) in batch {
        match registry.resolve(&job.name) {
            Some(destination) => {
                classified
                    .sub_batches
                    .entry(destination.to_string())
                    .or_default()
                    .insert(id, job);
            }
            None => {
                debug!(job_id = %id, view = %job.name, "View not registered");
                observability::record_unroutable(&job.name);
                classified
                    .failures
                    .insert(id, ViewJobResult::reference_error(&job.name));
            }
        }
    }

    classified
}
