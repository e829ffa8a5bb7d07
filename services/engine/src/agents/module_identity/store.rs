//! Identity directory abstraction

use anyhow::Result;
use async_trait::async_trait;

use super::types::Identity;

/// Remote directory of module identities
///
/// Create and remove must be idempotent so that a failed reconciliation can
/// simply be retried.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// List every identity registered for this device
    async fn list_identities(&self) -> Result<Vec<Identity>>;

    /// Create an identity tagged with `managed_by`
    async fn create_identity(&self, module_id: &str, managed_by: &str) -> Result<Identity>;

    /// Remove an identity
    async fn remove_identity(&self, module_id: &str) -> Result<()>;
}
