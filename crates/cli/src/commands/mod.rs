//! Command implementations.

mod info;
mod render;
mod serve;
mod validate;

pub use info::run_info;
pub use render::run_render;
pub use serve::run_serve;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::RegistryLoader;
use contracts::Registry;

/// Load a registry, failing with a readable message when the file is absent
pub(crate) fn load_registry(path: &Path) -> Result<Registry> {
    if !path.exists() {
        anyhow::bail!("Registry file not found: {}", path.display());
    }

    RegistryLoader::load_from_path(path)
        .with_context(|| format!("Failed to load registry from {}", path.display()))
}
