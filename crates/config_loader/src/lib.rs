//! # Config Loader
//!
//! View registry loading and parsing module.
//!
//! Responsibilities:
//! - Parse JSON/TOML registry files
//! - Validate server addresses
//! - Produce the read-only `Registry`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::RegistryLoader;
//! use std::path::Path;
//!
//! let registry = RegistryLoader::load_from_path(Path::new("views.json")).unwrap();
//! println!("Views: {}", registry.len());
//! ```

mod parser;
mod validator;

pub use contracts::Registry;
pub use parser::ConfigFormat;
pub use validator::collect_warnings;

use contracts::ContractError;
use std::path::Path;

/// Registry loader
///
/// Provides static methods to load a registry from files or strings.
pub struct RegistryLoader;

impl RegistryLoader {
    /// Load registry from file path
    ///
    /// Automatically detects format from file extension (.json / .toml).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<Registry, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load registry from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Registry, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize registry to JSON string
    pub fn to_json(registry: &Registry) -> Result<String, ContractError> {
        serde_json::to_string_pretty(registry)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Serialize registry to TOML string
    pub fn to_toml(registry: &Registry) -> Result<String, ContractError> {
        toml::to_string_pretty(registry)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }
}

impl RegistryLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<Registry, ContractError> {
        let registry = parser::parse(content, format)?;
        validator::validate(&registry)?;
        Ok(registry)
    }
}
