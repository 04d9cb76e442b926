//! Router assembly and serving

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use contracts::DestinationClient;
use multiplexer::Multiplexer;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::error::ServerError;
use crate::handlers;

/// Shared application state
pub struct AppState<C> {
    pub multiplexer: Multiplexer<C>,
}

impl<C> AppState<C> {
    pub fn new(multiplexer: Multiplexer<C>) -> Self {
        Self { multiplexer }
    }
}

/// CORS policy for browser clients
///
/// Any origin; preflight requests never reach the handlers.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::ACCEPT_ENCODING,
            HeaderName::from_static("x-csrf-token"),
            header::AUTHORIZATION,
        ])
}

/// Build the application router
///
/// Batch bodies are not size-limited; only malformed input is rejected.
pub fn build_router<C>(state: Arc<AppState<C>>) -> Router
where
    C: DestinationClient + Sync + 'static,
{
    Router::new()
        .route("/batch", post(handlers::batch::<C>))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::disable())
        .layer(cors_layer())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<C, F>(
    listener: TcpListener,
    state: Arc<AppState<C>>,
    shutdown: F,
) -> Result<(), ServerError>
where
    C: DestinationClient + Sync + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
