//! Reconciler configuration and module set loading

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use super::naming::EDGE_MANAGED_BY;
use super::types::{IdentityError, ModuleSet};

/// Immutable reconciler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Tag written on identities this agent creates; only identities carrying
    /// it are ever removed
    pub managed_by: String,
    /// Host name non-hub modules use to reach the backend through the hub
    pub gateway_host_name: String,
}

impl ReconcilerConfig {
    /// Settings with the default `IotEdge` tag
    pub fn new(gateway_host_name: impl Into<String>) -> Self {
        Self {
            managed_by: EDGE_MANAGED_BY.to_string(),
            gateway_host_name: gateway_host_name.into(),
        }
    }

    /// Override the `managedBy` tag
    pub fn managed_by(mut self, managed_by: impl Into<String>) -> Self {
        self.managed_by = managed_by.into();
        self
    }

    /// Reject blank values
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.managed_by.trim().is_empty() {
            return Err(IdentityError::Configuration("managed_by must not be blank".to_string()));
        }
        if self.gateway_host_name.trim().is_empty() {
            return Err(IdentityError::Configuration(
                "gateway_host_name must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a module set from a JSON array of modules
pub fn load_module_set(path: &Path) -> Result<ModuleSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read module set from {}", path.display()))?;

    let set: ModuleSet = serde_json::from_str(&content)
        .with_context(|| format!("Invalid module set in {}", path.display()))?;

    debug!(path = %path.display(), modules = set.len(), "Loaded module set");
    Ok(set)
}
