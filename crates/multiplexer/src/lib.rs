//! # Multiplexer
//!
//! Scatter-gather core of the render cluster.
//!
//! Responsibilities:
//! - Classify a batch by destination through the `Registry`
//! - Send one aggregated request per destination, concurrently
//! - Merge every partial result, synthesized failures included, into one response

pub mod classifier;
pub mod destinations;
pub mod dispatcher;
pub mod error;
pub mod merger;
pub mod metrics;
pub mod multiplexer;

pub use classifier::{classify, Classified};
pub use contracts::{BatchRequest, BatchResponse, DestinationClient, Registry};
pub use destinations::{HttpDestination, HttpDestinationConfig, MockBehavior, MockDestination};
pub use dispatcher::{DestinationOutcome, Dispatcher, DispatcherConfig};
pub use error::MultiplexerError;
pub use merger::merge;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use multiplexer::{create_multiplexer, Multiplexer, MultiplexerBuilder};
