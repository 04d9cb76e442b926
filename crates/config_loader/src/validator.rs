//! Registry validation
//!
//! Rules:
//! - view names are non-empty
//! - every non-empty server is an absolute http(s) URL
//!
//! Empty servers are legal; those views resolve as unregistered.

use contracts::{ContractError, Registry};
use url::Url;

/// Validate a registry
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(registry: &Registry) -> Result<(), ContractError> {
    validate_view_names(registry)?;
    validate_servers(registry)?;
    Ok(())
}

/// Non-fatal issues worth reporting
pub fn collect_warnings(registry: &Registry) -> Vec<String> {
    let mut warnings = Vec::new();

    if registry.is_empty() {
        warnings.push("registry is empty - every job will fail with ReferenceError".to_string());
    }

    for (view, def) in registry.views() {
        if def.server.is_empty() {
            warnings.push(format!(
                "view '{view}' has no server - jobs for it will fail with ReferenceError"
            ));
        }
    }

    warnings
}

fn validate_view_names(registry: &Registry) -> Result<(), ContractError> {
    if registry.views().any(|(view, _)| view.trim().is_empty()) {
        return Err(ContractError::config_validation(
            "<view name>",
            "view name cannot be empty",
        ));
    }
    Ok(())
}

fn validate_servers(registry: &Registry) -> Result<(), ContractError> {
    for (view, def) in registry.views() {
        if def.server.is_empty() {
            continue;
        }

        let url = Url::parse(&def.server).map_err(|e| {
            ContractError::config_validation(
                format!("{view}.Server"),
                format!("invalid server address '{}': {e}", def.server),
            )
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ContractError::config_validation(
                format!("{view}.Server"),
                format!("unsupported scheme '{}', expected http or https", url.scheme()),
            ));
        }
    }
    Ok(())
}
