//! Multiplexer - classify, dispatch, merge

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{BatchRequest, BatchResponse, DestinationClient, Registry};
use tracing::{info, instrument};

use crate::classifier::classify;
use crate::destinations::{HttpDestination, HttpDestinationConfig};
use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::error::MultiplexerError;
use crate::merger::merge;
use crate::metrics::DispatchMetrics;

/// Builder for creating a Multiplexer
pub struct MultiplexerBuilder {
    registry: Arc<Registry>,
    config: DispatcherConfig,
    http: HttpDestinationConfig,
}

impl MultiplexerBuilder {
    /// Create a new MultiplexerBuilder
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: DispatcherConfig::default(),
            http: HttpDestinationConfig::default(),
        }
    }

    /// Per-destination deadline
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Cap on concurrent destination requests
    pub fn max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.config.max_concurrency = limit;
        self
    }

    /// HTTP transport settings used by [`build_http`](Self::build_http)
    pub fn http_config(mut self, http: HttpDestinationConfig) -> Self {
        self.http = http;
        self
    }

    /// Build over the HTTP transport
    #[instrument(name = "multiplexer_builder_build_http", skip(self))]
    pub fn build_http(self) -> Result<Multiplexer<HttpDestination>, MultiplexerError> {
        let client = HttpDestination::new("http", self.http.clone())
            .map_err(|e| MultiplexerError::client_creation("http", e.to_string()))?;
        Ok(self.build_with(client))
    }

    /// Build over a caller-supplied transport
    pub fn build_with<C>(self, client: C) -> Multiplexer<C>
    where
        C: DestinationClient + Sync + 'static,
    {
        Multiplexer {
            registry: self.registry,
            dispatcher: Dispatcher::new(client, self.config),
        }
    }
}

/// Scatter-gather front for a set of render servers
pub struct Multiplexer<C> {
    registry: Arc<Registry>,
    dispatcher: Dispatcher<C>,
}

impl<C> Multiplexer<C>
where
    C: DestinationClient + Sync + 'static,
{
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        self.dispatcher.metrics()
    }

    /// Render a batch
    ///
    /// The response holds exactly one result per job in `batch`.
    #[instrument(name = "multiplexer_render", skip(self, batch), fields(jobs = batch.len()))]
    pub async fn render(&self, batch: BatchRequest) -> BatchResponse {
        let started = Instant::now();
        let jobs = batch.len();

        let classified = classify(batch, &self.registry);
        let destinations = classified.destination_count();

        self.metrics().add_batch(jobs);
        self.metrics().add_unroutable(classified.failures.len());
        observability::record_batch(jobs, destinations);

        let outcomes = self.dispatcher.dispatch(classified.sub_batches).await;
        let response = merge(classified.failures, outcomes);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::record_batch_latency_ms(elapsed_ms);

        info!(
            jobs,
            destinations,
            succeeded = response.success_count(),
            elapsed_ms = format!("{elapsed_ms:.2}"),
            "Batch rendered"
        );

        response
    }

    /// Render a raw JSON batch body
    ///
    /// # Errors
    /// `InvalidBatch` if the body is not a job map; nothing is dispatched then.
    pub async fn render_json(&self, body: &[u8]) -> Result<BatchResponse, MultiplexerError> {
        let batch: BatchRequest = serde_json::from_slice(body)?;
        Ok(self.render(batch).await)
    }
}

/// Convenience function to create an HTTP multiplexer
pub fn create_multiplexer(
    registry: Registry,
    config: DispatcherConfig,
) -> Result<Multiplexer<HttpDestination>, MultiplexerError> {
    MultiplexerBuilder::new(Arc::new(registry))
        .request_timeout(config.request_timeout)
        .max_concurrency(config.max_concurrency)
        .build_http()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destinations::{MockBehavior, MockDestination};
    use contracts::{ViewErrorKind, ViewJob};
    use serde_json::json;

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::from_pairs([
            ("Foo", "s1"),
            ("Bar", "s1"),
            ("Baz", "s2"),
        ]))
    }

    fn job(name: &str) -> ViewJob {
        ViewJob::new(name, json!({}))
    }

    #[tokio::test]
    async fn test_same_destination_single_request() {
        let mux = MultiplexerBuilder::new(registry()).build_with(MockDestination::new());

        let batch = BatchRequest::from([("a".to_string(), job("Foo")), ("b".to_string(), job("Bar"))]);
        let response = mux.render(batch).await;

        assert_eq!(response.len(), 2);
        assert_eq!(response.success_count(), 2);
        let calls = mux.dispatcher().client().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].destination, "s1");
        assert_eq!(calls[0].job_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_unregistered_view_makes_no_call() {
        let mux = MultiplexerBuilder::new(registry()).build_with(MockDestination::new());

        let batch = BatchRequest::from([("a".to_string(), job("Unknown"))]);
        let response = mux.render(batch).await;

        let result = response.get("a").unwrap();
        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ViewErrorKind::ReferenceError));
        assert!(mux.dispatcher().client().calls().is_empty());
        assert_eq!(mux.metrics().snapshot().unroutable, 1);
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let client = MockDestination::new().with_behavior("s2", MockBehavior::Unreachable);
        let mux = MultiplexerBuilder::new(registry()).build_with(client);

        let batch = BatchRequest::from([
            ("a".to_string(), job("Foo")),
            ("b".to_string(), job("Baz")),
            ("c".to_string(), job("Nope")),
        ]);
        let response = mux.render(batch).await;

        assert_eq!(response.len(), 3);
        assert!(response.get("a").unwrap().success);
        assert_eq!(
            response.get("b").unwrap().error_kind(),
            Some(ViewErrorKind::ConnectionRefused)
        );
        assert_eq!(
            response.get("c").unwrap().error_kind(),
            Some(ViewErrorKind::ReferenceError)
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let mux = MultiplexerBuilder::new(registry()).build_with(MockDestination::new());
        let response = mux.render(BatchRequest::new()).await;
        assert!(response.is_empty());
        assert!(mux.dispatcher().client().calls().is_empty());
        assert_eq!(mux.metrics().batches(), 1);
    }

    #[tokio::test]
    async fn test_render_json_rejects_malformed_body() {
        let mux = MultiplexerBuilder::new(registry()).build_with(MockDestination::new());

        let err = mux.render_json(b"[1, 2, 3]").await.unwrap_err();
        assert!(matches!(err, MultiplexerError::InvalidBatch(_)));
        assert!(mux.dispatcher().client().calls().is_empty());

        let ok = mux
            .render_json(br#"{ "a": { "name": "Foo", "data": {} } }"#)
            .await
            .unwrap();
        assert!(ok.get("a").unwrap().success);
    }

    #[tokio::test]
    async fn test_completeness_under_mixed_outcomes() {
        let client = MockDestination::new()
            .with_behavior("s1", MockBehavior::DropJobs(vec!["j1".to_string()]))
            .with_behavior("s2", MockBehavior::Garbage);
        let mux = MultiplexerBuilder::new(registry()).build_with(client);

        let batch: BatchRequest = (0..12)
            .map(|i| {
                let view = ["Foo", "Bar", "Baz", "Nope"][i % 4];
                (format!("j{i}"), job(view))
            })
            .collect();
        let ids: Vec<String> = batch.keys().cloned().collect();

        let response = mux.render(batch).await;

        assert_eq!(response.len(), ids.len());
        for id in &ids {
            assert!(response.get(id).is_some(), "missing {id}");
        }
        assert_eq!(
            response.get("j1").unwrap().error_kind(),
            Some(ViewErrorKind::MissingResult)
        );
        assert_eq!(
            response.get("j3").unwrap().error_kind(),
            Some(ViewErrorKind::ReferenceError)
        );
        assert_eq!(
            response.get("j2").unwrap().error_kind(),
            Some(ViewErrorKind::DecodeError)
        );
    }

    #[test]
    fn test_create_multiplexer_http() {
        let mux = create_multiplexer(
            Registry::from_pairs([("Foo", "http://127.0.0.1:1/batch")]),
            DispatcherConfig {
                request_timeout: Some(Duration::from_secs(1)),
                max_concurrency: Some(4),
            },
        )
        .unwrap();
        assert_eq!(mux.registry().len(), 1);
        assert_eq!(
            mux.dispatcher().config().request_timeout,
            Some(Duration::from_secs(1))
        );
    }
}
