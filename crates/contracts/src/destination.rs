//! DestinationClient trait - Dispatcher outbound interface
//!
//! Abstracts the transport used to deliver one sub-batch to one render server.

use crate::{BatchRequest, BatchResponse, ContractError};

/// Outbound render transport
///
/// Implementations issue exactly one request per call and return the
/// destination's `results` verbatim. Completeness is checked by the caller.
#[trait_variant::make(DestinationClient: Send)]
pub trait LocalDestinationClient {
    /// Client name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Send `batch` to `destination` and await its aggregated response
    ///
    /// # Errors
    /// Connection, timeout, status and decode failures, each naming the destination
    async fn render_batch(
        &self,
        destination: &str,
        batch: &BatchRequest,
    ) -> Result<BatchResponse, ContractError>;
}
