//! HttpDestination - JSON POST to a render server

use std::time::Duration;

use contracts::{BatchRequest, BatchResponse, ContractError, DestinationClient};
use tracing::{debug, instrument};

/// Configuration for HttpDestination
#[derive(Debug, Clone)]
pub struct HttpDestinationConfig {
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout enforced by the HTTP client (None = rely on the dispatcher deadline)
    pub request_timeout: Option<Duration>,
    /// Idle keep-alive connections kept per render server
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpDestinationConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: None,
            pool_max_idle_per_host: 16,
        }
    }
}

/// Client that sends sub-batches over HTTP
pub struct HttpDestination {
    name: String,
    config: HttpDestinationConfig,
    client: reqwest::Client,
}

impl HttpDestination {
    /// Create a new HttpDestination
    pub fn new(name: impl Into<String>, config: HttpDestinationConfig) -> Result<Self, ContractError> {
        let name = name.into();

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(concat!("nova-cluster/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ContractError::Other(format!("failed to build HTTP client '{name}': {e}")))?;

        debug!(client = %name, "HttpDestination created");

        Ok(Self {
            name,
            config,
            client,
        })
    }

    pub fn config(&self) -> &HttpDestinationConfig {
        &self.config
    }

    fn send_error(&self, destination: &str, err: &reqwest::Error) -> ContractError {
        match self.config.request_timeout {
            Some(timeout) if err.is_timeout() => ContractError::DestinationTimeout {
                destination: destination.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
            _ => ContractError::destination_connection(destination, error_chain(err)),
        }
    }
}

impl DestinationClient for HttpDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_destination_render_batch",
        skip(self, batch),
        fields(client = %self.name, jobs = batch.len())
    )]
    async fn render_batch(
        &self,
        destination: &str,
        batch: &BatchRequest,
    ) -> Result<BatchResponse, ContractError> {
        let response = self
            .client
            .post(destination)
            .json(batch)
            .send()
            .await
            .map_err(|e| self.send_error(destination, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContractError::DestinationStatus {
                destination: destination.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.send_error(destination, &e))?;

        debug!(destination, bytes = body.len(), "Render server body received");

        serde_json::from_slice(&body)
            .map_err(|e| ContractError::destination_decode(destination, e.to_string()))
    }
}

/// Render an error with its sources, `outer: inner: root`
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
