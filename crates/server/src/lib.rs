//! # Server
//!
//! Inbound HTTP surface of the multiplexer.
//!
//! Routes:
//! - `POST /batch` - render a batch
//! - `OPTIONS /batch` - CORS preflight, answered by the CORS layer
//! - `GET /health` - liveness

mod error;
mod handlers;
mod router;

pub use error::ServerError;
pub use router::{build_router, cors_layer, serve, AppState};
