//! `render` command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use multiplexer::{
    BatchResponse, DestinationClient, MockDestination, Multiplexer, MultiplexerBuilder,
};
use tracing::info;

use super::load_registry;
use crate::cli::RenderArgs;

/// Execute the `render` command
pub async fn run_render(args: &RenderArgs) -> Result<()> {
    let registry = load_registry(&args.config)?;

    let body = tokio::fs::read(&args.batch)
        .await
        .with_context(|| format!("Failed to read batch from {}", args.batch.display()))?;

    let builder = MultiplexerBuilder::new(Arc::new(registry))
        .request_timeout(args.dispatch.request_timeout())
        .max_concurrency(args.dispatch.concurrency_limit());

    let response = if args.dry_run {
        info!("Dry run mode - answering from the in-memory destination");
        let multiplexer = builder.build_with(MockDestination::new());
        render_body(&multiplexer, &body, &args.batch).await?
    } else {
        let multiplexer = builder
            .build_http()
            .context("Failed to create multiplexer")?;
        render_body(&multiplexer, &body, &args.batch).await?
    };

    info!(
        jobs = response.len(),
        succeeded = response.success_count(),
        "Render complete"
    );

    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{}", json);

    Ok(())
}

async fn render_body<C>(
    multiplexer: &Multiplexer<C>,
    body: &[u8],
    path: &Path,
) -> Result<BatchResponse>
where
    C: DestinationClient + Sync + 'static,
{
    multiplexer
        .render_json(body)
        .await
        .with_context(|| format!("Invalid batch in {}", path.display()))
}
