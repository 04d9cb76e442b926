//! Multiplexer error types

use thiserror::Error;

/// Multiplexer-specific errors
///
/// Per-job failures never surface here; they are folded into the response.
#[derive(Debug, Error)]
pub enum MultiplexerError {
    /// Incoming batch body is not a job map
    #[error("invalid batch request: {0}")]
    InvalidBatch(#[from] serde_json::Error),

    /// Outbound transport could not be constructed
    #[error("failed to create destination client '{name}': {message}")]
    ClientCreation { name: String, message: String },
}

impl MultiplexerError {
    /// Create a client creation error
    pub fn client_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClientCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
