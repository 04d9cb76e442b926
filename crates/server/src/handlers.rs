//! Route handlers

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use contracts::{BatchResponse, DestinationClient};
use tracing::{instrument, warn};

use crate::error::ServerError;
use crate::router::AppState;

/// `POST /batch`
///
/// Body is decoded here rather than by an extractor so a malformed body gets
/// the JSON error shape instead of axum's plain-text rejection.
#[instrument(name = "server_batch", skip_all, fields(bytes = body.len()))]
pub async fn batch<C>(
    State(state): State<Arc<AppState<C>>>,
    body: Bytes,
) -> Result<Json<BatchResponse>, ServerError>
where
    C: DestinationClient + Sync + 'static,
{
    match state.multiplexer.render_json(&body).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!(error = %e, "Rejected batch request");
            Err(e.into())
        }
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
