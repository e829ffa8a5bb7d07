//! Types for module identity reconciliation
//!
//! Modules and module sets describe what the edge agent runs; identities are
//! the records the edge security daemon keeps for each of them.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;
use thiserror::Error;

use super::credentials::ModuleConnectionString;
use super::naming::SYSTEM_IDENTITY_PREFIX;

/// Runtime status a module is configured to be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    #[default]
    Running,
    Stopped,
}

/// A workload module the edge agent is configured to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Runtime type (e.g., "docker")
    #[serde(rename = "type", default = "default_module_type")]
    pub module_type: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub status: ModuleStatus,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_module_type() -> String {
    "docker".to_string()
}

impl Module {
    /// Create a running docker module with the given image
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            module_type: default_module_type(),
            image: image.into(),
            status: ModuleStatus::Running,
            env: BTreeMap::new(),
        }
    }

    /// Set the module version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Check that a logical module name can be mapped to an identity name and back.
///
/// The `$` prefix is reserved for system identity names.
pub fn validate_module_name(name: &str) -> Result<(), IdentityError> {
    if name.trim().is_empty() || name.starts_with(SYSTEM_IDENTITY_PREFIX) {
        return Err(IdentityError::InvalidModuleName(name.to_string()));
    }
    Ok(())
}

/// A collection of modules keyed by their unique name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Module>", into = "Vec<Module>")]
pub struct ModuleSet {
    modules: BTreeMap<String, Module>,
}

impl ModuleSet {
    /// Build a module set, rejecting invalid or duplicate names
    pub fn new(modules: impl IntoIterator<Item = Module>) -> Result<Self, IdentityError> {
        let mut set = BTreeMap::new();
        for module in modules {
            validate_module_name(&module.name)?;
            match set.entry(module.name.clone()) {
                Entry::Occupied(_) => return Err(IdentityError::DuplicateModule(module.name)),
                Entry::Vacant(slot) => {
                    slot.insert(module);
                }
            }
        }
        Ok(Self { modules: set })
    }

    /// A set with no modules
    pub fn empty() -> Self {
        Self::default()
    }

    /// Module with the given name
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Whether a module with this name is present
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules ordered by name
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Module names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl TryFrom<Vec<Module>> for ModuleSet {
    type Error = IdentityError;

    fn try_from(modules: Vec<Module>) -> Result<Self, Self::Error> {
        Self::new(modules)
    }
}

impl From<ModuleSet> for Vec<Module> {
    fn from(set: ModuleSet) -> Self {
        set.modules.into_values().collect()
    }
}

/// Delta between a desired and a current module set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Modules that are new or changed and need a valid identity
    pub updated: Vec<Module>,
    /// Names of modules that are no longer desired
    pub removed: Vec<String>,
}

impl Diff {
    /// True when nothing was updated or removed
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}

/// An identity record held by the edge security daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Identity name (an encoded module name)
    pub module_id: String,
    /// Tag of the system that provisioned this identity
    #[serde(default)]
    pub managed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<String>,
}

impl Identity {
    /// Create an identity record without a generation ID
    pub fn new(module_id: impl Into<String>, managed_by: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            managed_by: managed_by.into(),
            generation_id: None,
        }
    }

    /// Whether the identity was provisioned by the system using `tag`.
    ///
    /// Case-insensitive for ASCII only; non-ASCII characters must match exactly.
    pub fn is_managed_by(&self, tag: &str) -> bool {
        self.managed_by.eq_ignore_ascii_case(tag)
    }
}

/// A module paired with a ready-to-use connection credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleIdentity {
    pub module_name: String,
    pub module_id: String,
    pub credential: ModuleConnectionString,
}

/// Module identities keyed by logical module name.
///
/// Unlike a plain map, inserting a name twice is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModuleIdentities {
    entries: BTreeMap<String, ModuleIdentity>,
}

impl ModuleIdentities {
    /// An empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity, failing if its module name is already present
    pub fn insert(&mut self, identity: ModuleIdentity) -> Result<(), IdentityError> {
        match self.entries.entry(identity.module_name.clone()) {
            Entry::Occupied(existing) => Err(IdentityError::DuplicateModule(existing.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(identity);
                Ok(())
            }
        }
    }

    /// Identity for a logical module name
    pub fn get(&self, module_name: &str) -> Option<&ModuleIdentity> {
        self.entries.get(module_name)
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.entries.contains_key(module_name)
    }

    /// Number of module identities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ModuleIdentity> {
        self.entries.iter()
    }

    /// Module names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl IntoIterator for ModuleIdentities {
    type Item = (String, ModuleIdentity);
    type IntoIter = btree_map::IntoIter<String, ModuleIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Directory operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryOperation {
    List,
    Create,
    Remove,
}

impl std::fmt::Display for DirectoryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryOperation::List => write!(f, "list"),
            DirectoryOperation::Create => write!(f, "create"),
            DirectoryOperation::Remove => write!(f, "remove"),
        }
    }
}

/// Errors that can occur while reconciling module identities
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A required constructor argument was blank
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A module name cannot be mapped to an identity name
    #[error("Invalid module name: {0:?}")]
    InvalidModuleName(String),

    /// The same module name appeared twice
    #[error("Duplicate module name: {0}")]
    DuplicateModule(String),

    /// The identity directory rejected or failed an operation
    #[error("Identity directory {operation} failed for {module_id:?}: {source}")]
    Directory {
        operation: DirectoryOperation,
        module_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl IdentityError {
    pub(crate) fn directory(
        operation: DirectoryOperation,
        module_id: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        IdentityError::Directory {
            operation,
            module_id: module_id.into(),
            source,
        }
    }
}
