//! Layered error definitions
//!
//! Categorized by source: config / destination / general

use thiserror::Error;

use crate::ViewErrorKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Destination Errors =====
    /// Destination could not be reached
    #[error("render server {destination} unreachable: {message}")]
    DestinationConnection {
        destination: String,
        message: String,
    },

    /// Destination did not answer within the deadline
    #[error("render server {destination} did not respond within {timeout_ms}ms")]
    DestinationTimeout { destination: String, timeout_ms: u64 },

    /// Destination answered with a non-success HTTP status
    #[error("render server {destination} responded with status {status}")]
    DestinationStatus { destination: String, status: u16 },

    /// Destination response body is not a batch response
    #[error("render server {destination} sent an undecodable response: {message}")]
    DestinationDecode {
        destination: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create destination connection error
    pub fn destination_connection(
        destination: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DestinationConnection {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create destination decode error
    pub fn destination_decode(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationDecode {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Per-job error kind this error degrades to
    ///
    /// Timeouts and error statuses are reported like refused connections.
    pub fn view_error_kind(&self) -> ViewErrorKind {
        match self {
            Self::DestinationDecode { .. } => ViewErrorKind::DecodeError,
            _ => ViewErrorKind::ConnectionRefused,
        }
    }
}
