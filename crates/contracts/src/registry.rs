//! Registry - view name to render server mapping
//!
//! Loaded once at process start by `config_loader`, shared read-only by every
//! batch afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Where a single view is rendered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    /// Render server address; empty means the view is not routable
    #[serde(rename = "Server", default)]
    pub server: String,
}

impl ViewDefinition {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
        }
    }
}

/// Immutable view registry
///
/// Serialized as a flat object: `{ "<view>": { "Server": "<address>" } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    views: BTreeMap<String, ViewDefinition>,
}

impl Registry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(view, server)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let views = pairs
            .into_iter()
            .map(|(view, server)| (view.into(), ViewDefinition::new(server)))
            .collect();
        Self { views }
    }

    /// Register or replace a view
    pub fn insert(&mut self, view: impl Into<String>, definition: ViewDefinition) {
        self.views.insert(view.into(), definition);
    }

    /// Resolve the destination for a view
    ///
    /// Returns `None` if the view is absent or its server is empty.
    pub fn resolve(&self, view: &str) -> Option<&str> {
        self.views
            .get(view)
            .map(|def| def.server.as_str())
            .filter(|server| !server.is_empty())
    }

    /// All view definitions, ordered by view name
    pub fn views(&self) -> impl Iterator<Item = (&str, &ViewDefinition)> {
        self.views.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Distinct non-empty destinations
    pub fn destinations(&self) -> BTreeSet<&str> {
        self.views
            .values()
            .map(|def| def.server.as_str())
            .filter(|server| !server.is_empty())
            .collect()
    }

    /// Views served by `destination`
    pub fn views_for(&self, destination: &str) -> Vec<&str> {
        self.views
            .iter()
            .filter(|(_, def)| def.server == destination)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
