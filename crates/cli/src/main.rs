//! # Nova Cluster CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Registry loading and validation
//! - The multiplexer HTTP server
//! - One-shot batch rendering

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_render, run_serve, run_validate};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        // No subscriber yet, so stderr is the only sink.
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Nova cluster CLI starting"
    );

    let result = match &cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Render(args) => run_render(args).await,
    };

    ExitCode::from(exit_status(&result))
}

/// Log a failed command once and map it to a process exit status
fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            1
        }
    }
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    observability::init_with_config(observability::ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
    })
}
