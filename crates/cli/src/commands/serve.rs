//! `serve` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use multiplexer::MultiplexerBuilder;
use server::AppState;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::load_registry;
use crate::cli::ServeArgs;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading registry");

    let registry = load_registry(&args.config)?;
    for warning in config_loader::collect_warnings(&registry) {
        warn!("{}", warning);
    }

    info!(
        views = registry.len(),
        destinations = registry.destinations().len(),
        "Registry loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let multiplexer = MultiplexerBuilder::new(Arc::new(registry))
        .request_timeout(args.dispatch.request_timeout())
        .max_concurrency(args.dispatch.concurrency_limit())
        .build_http()
        .context("Failed to create multiplexer")?;
    let metrics = Arc::clone(multiplexer.metrics());
    let state = Arc::new(AppState::new(multiplexer));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Nova cluster running on http://{}:{}", args.host, args.port);

    server::serve(listener, state, setup_shutdown_signal())
        .await
        .context("HTTP server failed")?;

    let snapshot = metrics.snapshot();
    info!(
        batches = snapshot.batches,
        jobs = snapshot.jobs,
        unroutable = snapshot.unroutable,
        destination_requests = snapshot.destination_requests,
        destination_failures = snapshot.destination_failures,
        missing_results = snapshot.missing_results,
        "Nova cluster stopped"
    );

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, draining connections...");
}
