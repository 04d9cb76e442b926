//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::Registry;
use serde::Serialize;
use tracing::info;

use super::load_registry;
use crate::cli::InfoArgs;

/// Registry info for JSON output
#[derive(Serialize)]
struct RegistryInfo {
    view_count: usize,
    destinations: Vec<DestinationInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unrouted_views: Vec<String>,
}

#[derive(Serialize)]
struct DestinationInfo {
    server: String,
    views: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading registry info");

    let registry = load_registry(&args.config)?;
    let info = build_registry_info(&registry);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize registry info")?;
        println!("{}", json);
    } else {
        print_registry_info(&info);
    }

    Ok(())
}

fn build_registry_info(registry: &Registry) -> RegistryInfo {
    let destinations = registry
        .destinations()
        .into_iter()
        .map(|server| DestinationInfo {
            server: server.to_string(),
            views: registry
                .views_for(server)
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
        .collect();

    let unrouted_views = registry
        .views()
        .filter(|(name, _)| registry.resolve(name).is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    RegistryInfo {
        view_count: registry.len(),
        destinations,
        unrouted_views,
    }
}

fn print_registry_info(info: &RegistryInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Nova Cluster Registry                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🖥  Destinations ({})", info.destinations.len());
    for (i, dest) in info.destinations.iter().enumerate() {
        let is_last = i == info.destinations.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({} views)", prefix, dest.server, dest.views.len());
        for (j, view) in dest.views.iter().enumerate() {
            let view_prefix = if j == dest.views.len() - 1 { "└─" } else { "├─" };
            println!("   {}  {} {}", child_prefix, view_prefix, view);
        }
    }

    if !info.unrouted_views.is_empty() {
        println!("\n⚠ Views without a server ({})", info.unrouted_views.len());
        for view in &info.unrouted_views {
            println!("   - {}", view);
        }
    }

    println!();
}
