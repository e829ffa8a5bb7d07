//! Module Identity Reconciler
//!
//! Brings the identity directory in line with the module set the agent is
//! about to run and hands back a connection string per module.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::config::ReconcilerConfig;
use super::credentials::{CredentialSelector, ModuleConnectionStringBuilder};
use super::diff::{DiffProvider, ModuleSetDiffer};
use super::naming::{module_identity_name, module_name};
use super::store::IdentityStore;
use super::types::{
    DirectoryOperation, Identity, IdentityError, ModuleIdentities, ModuleIdentity, ModuleSet,
};

/// Module Identity Reconciler
///
/// Holds only immutable configuration, so one instance can serve concurrent
/// callers.
pub struct ModuleIdentityReconciler {
    store: Arc<dyn IdentityStore>,
    differ: Arc<dyn DiffProvider>,
    selector: CredentialSelector,
    managed_by: String,
}

impl ModuleIdentityReconciler {
    /// Create a reconciler using the structural module set diff.
    ///
    /// Non-hub credentials are routed through `config.gateway_host_name`.
    pub fn new(
        store: Arc<dyn IdentityStore>,
        builder: ModuleConnectionStringBuilder,
        config: &ReconcilerConfig,
    ) -> Result<Self, IdentityError> {
        Self::with_differ(store, Arc::new(ModuleSetDiffer), builder, config)
    }

    /// Create a reconciler with a custom diff provider
    pub fn with_differ(
        store: Arc<dyn IdentityStore>,
        differ: Arc<dyn DiffProvider>,
        builder: ModuleConnectionStringBuilder,
        config: &ReconcilerConfig,
    ) -> Result<Self, IdentityError> {
        config.validate()?;

        Ok(Self {
            store,
            differ,
            selector: CredentialSelector::new(builder, &config.gateway_host_name)?,
            managed_by: config.managed_by.clone(),
        })
    }

    /// Tag written on created identities
    pub fn managed_by(&self) -> &str {
        &self.managed_by
    }

    /// Gateway host name applied to non-hub credentials
    pub fn gateway_host_name(&self) -> &str {
        self.selector.gateway_host_name()
    }

    /// Reconcile identities for the transition from `current` to `desired`.
    ///
    /// Removals all finish before any creation is issued. Any directory
    /// failure fails the whole call; nothing is rolled back.
    pub async fn reconcile(
        &self,
        desired: &ModuleSet,
        current: &ModuleSet,
    ) -> Result<ModuleIdentities, IdentityError> {
        let diff = self.differ.diff(desired, current);
        if diff.is_empty() {
            debug!("Module sets are identical, nothing to reconcile");
            return Ok(ModuleIdentities::new());
        }

        info!(
            updated = diff.updated.len(),
            removed = diff.removed.len(),
            "Reconciling module identities"
        );

        let updated: Vec<String> = diff
            .updated
            .iter()
            .map(|m| module_identity_name(&m.name))
            .collect();
        let removed: Vec<String> = diff.removed.iter().map(|n| module_identity_name(n)).collect();

        let mut identities: HashMap<String, Identity> = self
            .store
            .list_identities()
            .await
            .map_err(|e| IdentityError::directory(DirectoryOperation::List, "", e))?
            .into_iter()
            .map(|i| (i.module_id.clone(), i))
            .collect();

        let to_create: Vec<&String> = updated
            .iter()
            .filter(|id| !identities.contains_key(*id))
            .collect();
        let to_remove: Vec<&String> = removed
            .iter()
            .filter(|id| {
                identities
                    .get(*id)
                    .is_some_and(|i| i.is_managed_by(&self.managed_by))
            })
            .collect();

        for id in removed.iter().filter(|id| !to_remove.contains(id)) {
            if let Some(identity) = identities.get(id) {
                debug!(
                    module_id = %id,
                    managed_by = %identity.managed_by,
                    "Leaving identity owned by another system"
                );
            }
        }

        self.remove_all(&to_remove).await?;
        for id in &to_remove {
            identities.remove(*id);
        }

        let created = self.create_all(&to_create).await?;

        let mut result = ModuleIdentities::new();
        for identity in created.iter().chain(identities.values()) {
            result.insert(ModuleIdentity {
                module_name: module_name(&identity.module_id),
                module_id: identity.module_id.clone(),
                credential: self.selector.select(identity),
            })?;
        }

        info!(
            created = created.len(),
            removed = to_remove.len(),
            identities = result.len(),
            "Module identity reconciliation complete"
        );

        Ok(result)
    }

    /// Issue every removal and wait for all of them, successful or not
    async fn remove_all(&self, ids: &[&String]) -> Result<(), IdentityError> {
        let results = join_all(ids.iter().map(|id| async move {
            debug!(module_id = %id, "Removing identity");
            self.store.remove_identity(id).await
        }))
        .await;

        first_failure(DirectoryOperation::Remove, ids, results).map(|_| ())
    }

    async fn create_all(&self, ids: &[&String]) -> Result<Vec<Identity>, IdentityError> {
        let results = join_all(ids.iter().map(|id| async move {
            debug!(module_id = %id, "Creating identity");
            self.store.create_identity(id, &self.managed_by).await
        }))
        .await;

        first_failure(DirectoryOperation::Create, ids, results)
    }
}

/// Log every failure and return the first one in submission order
fn first_failure<T>(
    operation: DirectoryOperation,
    ids: &[&String],
    results: Vec<anyhow::Result<T>>,
) -> Result<Vec<T>, IdentityError> {
    let mut values = Vec::with_capacity(results.len());
    let mut failure = None;

    for (id, result) in ids.iter().zip(results) {
        match result {
            Ok(value) => values.push(value),
            Err(e) => {
                warn!(module_id = %id, %operation, error = %e, "Identity operation failed");
                if failure.is_none() {
                    failure = Some(IdentityError::directory(operation, id.as_str(), e));
                }
            }
        }
    }

    match failure {
        Some(e) => {
            error!(%operation, failed = ids.len() - values.len(), "Identity phase failed");
            Err(e)
        }
        None => Ok(values),
    }
}
