//! Merger - keyed disjoint union of partial results

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use contracts::{BatchResponse, JobId, ViewJobResult};
use tracing::warn;

use crate::dispatcher::DestinationOutcome;

/// Combine classifier failures and destination outcomes into one response
///
/// Inputs are disjoint by construction. Should an id appear twice anyway, the
/// first result wins and the collision is logged.
pub fn merge(
    failures: HashMap<JobId, ViewJobResult>,
    outcomes: Vec<DestinationOutcome>,
) -> BatchResponse {
    let mut results = failures;

    for outcome in outcomes {
        for (id, result) in outcome.results {
            match results.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(result);
                }
                Entry::Occupied(slot) => {
                    warn!(
                        job_id = %slot.key(),
                        destination = %outcome.destination,
                        "Duplicate job id while merging, keeping first result"
                    );
                }
            }
        }
    }

    BatchResponse { results }
}
