//! Dispatcher - concurrent fan-out to render servers

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    BatchRequest, BatchResponse, ContractError, Destination, DestinationClient, JobId,
    ViewErrorKind, ViewJobResult,
};
use observability::CallStatus;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, instrument, warn};

use crate::metrics::DispatchMetrics;

/// Dispatcher configuration
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Deadline for one destination round trip (None = wait forever)
    pub request_timeout: Option<Duration>,
    /// Cap on in-flight destination requests (None = one task per destination, unbounded)
    pub max_concurrency: Option<usize>,
}

/// Everything one destination produced for one batch
#[derive(Debug, Clone)]
pub struct DestinationOutcome {
    pub destination: Destination,
    /// One entry per job sent to this destination
    pub results: HashMap<JobId, ViewJobResult>,
    pub status: CallStatus,
    /// Results synthesized because the destination omitted them
    pub missing: usize,
    pub latency: Duration,
}

impl DestinationOutcome {
    pub fn is_success(&self) -> bool {
        self.status == CallStatus::Success
    }
}

/// Sends each sub-batch to its destination as one request
pub struct Dispatcher<C> {
    client: Arc<C>,
    config: DispatcherConfig,
    limiter: Option<Arc<Semaphore>>,
    metrics: Arc<DispatchMetrics>,
}

impl<C> Dispatcher<C>
where
    C: DestinationClient + Sync + 'static,
{
    /// Create a dispatcher over `client`
    pub fn new(client: C, config: DispatcherConfig) -> Self {
        let limiter = config
            .max_concurrency
            .filter(|&n| n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));

        Self {
            client: Arc::new(client),
            config,
            limiter,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Share an existing metrics instance
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Dispatch every sub-batch and wait for all of them
    ///
    /// Returns one outcome per destination. Each outcome carries exactly one
    /// result per job that was routed to that destination, whether the call
    /// succeeded or not.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, sub_batches),
        fields(destinations = sub_batches.len())
    )]
    pub async fn dispatch(
        &self,
        sub_batches: HashMap<Destination, BatchRequest>,
    ) -> Vec<DestinationOutcome> {
        if sub_batches.is_empty() {
            return Vec::new();
        }

        // Kept so a task that dies without reporting can still be answered for.
        let manifests: HashMap<Destination, Vec<(JobId, String)>> = sub_batches
            .iter()
            .map(|(destination, batch)| {
                let jobs = batch
                    .iter()
                    .map(|(id, job)| (id.clone(), job.name.clone()))
                    .collect();
                (destination.clone(), jobs)
            })
            .collect();

        let (tx, mut rx) = mpsc::channel(sub_batches.len());

        for (destination, batch) in sub_batches {
            let tx = tx.clone();
            let client = Arc::clone(&self.client);
            let limiter = self.limiter.clone();
            let deadline = self.config.request_timeout;

            tokio::spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let outcome = call_destination(client.as_ref(), destination, batch, deadline).await;
                // Capacity equals the number of tasks, so this never waits.
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        // Join barrier: the channel closes once every task has finished.
        let mut outcomes = Vec::with_capacity(manifests.len());
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        let reported: HashSet<Destination> =
            outcomes.iter().map(|o| o.destination.clone()).collect();
        for (destination, jobs) in manifests {
            if !reported.contains(&destination) {
                error!(
                    destination = %destination,
                    jobs = jobs.len(),
                    "Dispatch task ended without reporting"
                );
                outcomes.push(lost_outcome(destination, jobs));
            }
        }

        for outcome in &outcomes {
            self.record(outcome);
        }

        outcomes
    }

    fn record(&self, outcome: &DestinationOutcome) {
        self.metrics.inc_destination_requests();
        if !outcome.is_success() {
            self.metrics.inc_destination_failures();
        }
        self.metrics.add_missing_results(outcome.missing);

        observability::record_destination_call(
            &outcome.destination,
            outcome.status,
            outcome.latency.as_secs_f64() * 1000.0,
        );
        observability::record_missing_results(&outcome.destination, outcome.missing);
    }
}

/// Send one sub-batch and turn whatever happens into per-job results
#[instrument(
    name = "dispatcher_call_destination",
    skip_all,
    fields(destination = %destination, jobs = batch.len())
)]
async fn call_destination<C: DestinationClient>(
    client: &C,
    destination: Destination,
    batch: BatchRequest,
    deadline: Option<Duration>,
) -> DestinationOutcome {
    let started = Instant::now();

    let response = {
        let call = client.render_batch(&destination, &batch);
        match deadline {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(response) => response,
                Err(_) => Err(ContractError::DestinationTimeout {
                    destination: destination.clone(),
                    timeout_ms: limit.as_millis() as u64,
                }),
            },
            None => call.await,
        }
    };

    let latency = started.elapsed();

    match response {
        Ok(response) => reconcile(destination, batch, response, latency),
        Err(err) => {
            warn!(
                destination = %destination,
                jobs = batch.len(),
                error = %err,
                "Render server call failed"
            );
            synthesize_failures(destination, batch, &err, latency)
        }
    }
}

/// Keep exactly the results for jobs that were sent
///
/// Unknown ids are discarded; omitted ids get a `MissingResult` failure.
fn reconcile(
    destination: Destination,
    batch: BatchRequest,
    response: BatchResponse,
    latency: Duration,
) -> DestinationOutcome {
    let mut returned = response.results;
    let mut results = HashMap::with_capacity(batch.len());
    let mut missing = 0;

    for (id, job) in batch {
        let result = match returned.remove(&id) {
            Some(result) => result,
            None => {
                missing += 1;
                ViewJobResult::missing(job.name, &destination)
            }
        };
        results.insert(id, result);
    }

    if !returned.is_empty() {
        warn!(
            destination = %destination,
            unexpected = returned.len(),
            "Render server returned results for jobs it was not sent, discarding"
        );
    }
    if missing > 0 {
        warn!(destination = %destination, missing, "Render server omitted results");
    }

    debug!(
        destination = %destination,
        results = results.len(),
        latency_ms = latency.as_millis() as u64,
        "Render server responded"
    );

    DestinationOutcome {
        destination,
        results,
        status: CallStatus::Success,
        missing,
        latency,
    }
}

fn synthesize_failures(
    destination: Destination,
    batch: BatchRequest,
    err: &ContractError,
    latency: Duration,
) -> DestinationOutcome {
    let results = batch
        .into_iter()
        .map(|(id, job)| (id, ViewJobResult::from_error(job.name, err)))
        .collect();

    DestinationOutcome {
        destination,
        results,
        status: call_status(err),
        missing: 0,
        latency,
    }
}

fn lost_outcome(destination: Destination, jobs: Vec<(JobId, String)>) -> DestinationOutcome {
    let message = format!("dispatch to render server {destination} ended without a response");
    let results = jobs
        .into_iter()
        .map(|(id, view)| {
            let result = ViewJobResult::failure(view, ViewErrorKind::ConnectionRefused, &message);
            (id, result)
        })
        .collect();

    DestinationOutcome {
        destination,
        results,
        status: CallStatus::Unreachable,
        missing: 0,
        latency: Duration::ZERO,
    }
}

fn call_status(err: &ContractError) -> CallStatus {
    match err {
        ContractError::DestinationTimeout { .. } => CallStatus::Timeout,
        ContractError::DestinationDecode { .. } => CallStatus::Decode,
        _ => CallStatus::Unreachable,
    }
}
