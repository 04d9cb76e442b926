//! MockDestination - in-process render servers
//!
//! Used by tests and by the CLI `render --dry-run` mode. Behaviour is configured
//! per destination address; every call is recorded.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use contracts::{
    BatchRequest, BatchResponse, ContractError, DestinationClient, JobId, ViewJobResult,
};
use tracing::{debug, instrument};

/// How a mock destination answers
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    /// Render every job
    #[default]
    Render,
    /// Fail as if the connection was refused
    Unreachable,
    /// Render after sleeping
    Delay(Duration),
    /// Render, but omit these ids from the response
    DropJobs(Vec<JobId>),
    /// Render, and add a result for an id that was never sent
    ExtraJob(JobId),
    /// Answer with a body that does not decode
    Garbage,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub destination: String,
    /// Job ids in the request, sorted
    pub job_ids: Vec<JobId>,
}

/// In-memory destination client
pub struct MockDestination {
    name: String,
    behaviors: HashMap<String, MockBehavior>,
    default_behavior: MockBehavior,
    calls: Mutex<Vec<MockCall>>,
}

impl MockDestination {
    /// Create a mock where every destination renders
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            behaviors: HashMap::new(),
            default_behavior: MockBehavior::Render,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the behaviour of one destination
    pub fn with_behavior(mut self, destination: impl Into<String>, behavior: MockBehavior) -> Self {
        self.behaviors.insert(destination.into(), behavior);
        self
    }

    /// Set the behaviour of destinations without an explicit entry
    pub fn with_default_behavior(mut self, behavior: MockBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    /// Calls received so far, in arrival order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made to `destination`
    pub fn call_count(&self, destination: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.destination == destination)
            .count()
    }

    fn behavior_for(&self, destination: &str) -> &MockBehavior {
        self.behaviors
            .get(destination)
            .unwrap_or(&self.default_behavior)
    }

    fn record_call(&self, destination: &str, batch: &BatchRequest) {
        let mut job_ids: Vec<JobId> = batch.keys().cloned().collect();
        job_ids.sort();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                destination: destination.to_string(),
                job_ids,
            });
    }
}

impl Default for MockDestination {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic markup for a rendered job
fn render_all(batch: &BatchRequest) -> BatchResponse {
    let results = batch
        .iter()
        .map(|(id, job)| {
            let html = format!("<div data-view=\"{}\">{}</div>", job.name, job.data);
            (id.clone(), ViewJobResult::rendered(job.name.clone(), html, 1.0))
        })
        .collect();
    BatchResponse { results }
}

impl DestinationClient for MockDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "mock_destination_render_batch",
        skip(self, batch),
        fields(jobs = batch.len())
    )]
    async fn render_batch(
        &self,
        destination: &str,
        batch: &BatchRequest,
    ) -> Result<BatchResponse, ContractError> {
        self.record_call(destination, batch);
        let behavior = self.behavior_for(destination).clone();
        debug!(destination, ?behavior, "Mock destination called");

        match behavior {
            MockBehavior::Render => Ok(render_all(batch)),
            MockBehavior::Unreachable => Err(ContractError::destination_connection(
                destination,
                "tcp connect error: connection refused",
            )),
            MockBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(render_all(batch))
            }
            MockBehavior::DropJobs(ids) => {
                let mut response = render_all(batch);
                for id in &ids {
                    response.results.remove(id);
                }
                Ok(response)
            }
            MockBehavior::ExtraJob(id) => {
                let mut response = render_all(batch);
                response
                    .results
                    .insert(id, ViewJobResult::rendered("Stray", "", 0.0));
                Ok(response)
            }
            MockBehavior::Garbage => Err(ContractError::destination_decode(
                destination,
                "expected value at line 1 column 1",
            )),
        }
    }
}
