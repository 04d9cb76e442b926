//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Nova cluster - scatter-gather multiplexer for view render servers
#[derive(Parser, Debug)]
#[command(
    name = "nova-cluster",
    author,
    version,
    about = "Batch render multiplexer for Nova view servers",
    long_about = "Accepts batches of named view render jobs, routes each job to the render \n\
                  server registered for its view, issues one request per server and \n\
                  merges the partial results into a single response."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "NOVA_CLUSTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "NOVA_CLUSTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the multiplexer HTTP server
    Serve(ServeArgs),

    /// Validate a registry file without serving
    Validate(ValidateArgs),

    /// Display destinations and the views they serve
    Info(InfoArgs),

    /// Render a batch file once and print the merged response
    Render(RenderArgs),
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Path to the view registry (JSON or TOML)
    #[arg(short, long, default_value = "views.json", env = "CONFIG_FILE")]
    pub config: PathBuf,

    /// Listen port
    #[arg(short, long, default_value = "8000", env = "PORT")]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0", env = "NOVA_CLUSTER_HOST")]
    pub host: String,

    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "NOVA_CLUSTER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Outbound dispatch tuning shared by `serve` and `render`
#[derive(Parser, Debug, Clone)]
pub struct DispatchArgs {
    /// Per-destination deadline in milliseconds (0 = wait indefinitely)
    #[arg(long, default_value = "30000", env = "NOVA_CLUSTER_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Maximum concurrent destination requests (0 = unbounded)
    #[arg(long, default_value = "0", env = "NOVA_CLUSTER_MAX_CONCURRENCY")]
    pub max_concurrency: usize,
}

impl DispatchArgs {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrency > 0).then_some(self.max_concurrency)
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to registry file to validate
    #[arg(short, long, default_value = "views.json", env = "CONFIG_FILE")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to registry file
    #[arg(short, long, default_value = "views.json", env = "CONFIG_FILE")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `render` command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Path to registry file
    #[arg(short, long, default_value = "views.json", env = "CONFIG_FILE")]
    pub config: PathBuf,

    /// Batch request file (`{ "<id>": { "name": ..., "data": ... } }`)
    #[arg(short, long)]
    pub batch: PathBuf,

    /// Route the batch but answer from an in-memory echo destination
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub dispatch: DispatchArgs,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
