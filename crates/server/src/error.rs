//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to HTTP callers as a single top-level failure
#[derive(Debug, Error)]
pub enum ServerError {
    /// Request body is not a batch
    #[error("invalid batch request: {0}")]
    BadRequest(String),

    /// Server-side fault unrelated to the request body
    #[error("internal error: {0}")]
    Internal(String),

    /// Listener failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<multiplexer::MultiplexerError> for ServerError {
    fn from(err: multiplexer::MultiplexerError) -> Self {
        match err {
            multiplexer::MultiplexerError::InvalidBatch(e) => Self::BadRequest(e.to_string()),
            other @ multiplexer::MultiplexerError::ClientCreation { .. } => {
                Self::Internal(other.to_string())
            }
        }
    }
}
