//! Module Identity Agent
//!
//! Keeps the edge security daemon's identity directory in step with the
//! modules the edge agent runs, and derives a connection string for each
//! module.
//!
//! ## Flow
//!
//! 1. Diff the desired and current module sets
//! 2. List identities once
//! 3. Remove stale identities owned by this agent, and wait for all of them
//! 4. Create missing identities concurrently
//! 5. Build a connection string per identity; only the hub connects without
//!    a gateway
//!
//! ## Example Usage
//!
//! ```ignore
//! use edge_identity_engine::agents::module_identity::*;
//!
//! let store = Arc::new(EdgeletIdentityClient::new("http://localhost:15580", DEFAULT_API_VERSION)?);
//! let builder = ModuleConnectionStringBuilder::new("hub.azure-devices.net", "edge-device")?;
//! let config = ReconcilerConfig::new("edge-gateway.local");
//! let reconciler = ModuleIdentityReconciler::new(store, builder, &config)?;
//!
//! let identities = reconciler.reconcile(&desired, &current).await?;
//! ```

mod config;
mod credentials;
mod diff;
mod edgelet;
mod naming;
mod reconciler;
mod store;
mod types;

pub use config::{load_module_set, ReconcilerConfig};
pub use credentials::{CredentialSelector, ModuleConnectionString, ModuleConnectionStringBuilder};
pub use diff::{DiffProvider, ModuleSetDiffer};
pub use edgelet::{EdgeletIdentityClient, DEFAULT_API_VERSION};
pub use naming::*;
pub use reconciler::ModuleIdentityReconciler;
pub use store::IdentityStore;
pub use types::*;
