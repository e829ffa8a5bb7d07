//! Edge Identity Engine Library
//!
//! Module identity reconciliation for the edge agent.

pub mod agents;

pub use agents::module_identity;
pub use agents::module_identity::ModuleIdentityReconciler;
