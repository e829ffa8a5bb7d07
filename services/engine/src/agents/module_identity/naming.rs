//! Module name <-> identity name mapping
//!
//! The two system modules are registered under `$`-prefixed identity names;
//! every other module uses its own name.

/// Prefix reserved for system identity names
pub const SYSTEM_IDENTITY_PREFIX: char = '$';

pub const EDGE_AGENT_MODULE_NAME: &str = "edgeAgent";
pub const EDGE_AGENT_IDENTITY_NAME: &str = "$edgeAgent";
pub const EDGE_HUB_MODULE_NAME: &str = "edgeHub";
pub const EDGE_HUB_IDENTITY_NAME: &str = "$edgeHub";

/// Default `managedBy` tag for identities this agent provisions
pub const EDGE_MANAGED_BY: &str = "IotEdge";

/// Identity name for a logical module name
pub fn module_identity_name(module_name: &str) -> String {
    match module_name {
        EDGE_AGENT_MODULE_NAME => EDGE_AGENT_IDENTITY_NAME.to_string(),
        EDGE_HUB_MODULE_NAME => EDGE_HUB_IDENTITY_NAME.to_string(),
        other => other.to_string(),
    }
}

/// Logical module name for an identity name
pub fn module_name(identity_name: &str) -> String {
    match identity_name {
        EDGE_AGENT_IDENTITY_NAME => EDGE_AGENT_MODULE_NAME.to_string(),
        EDGE_HUB_IDENTITY_NAME => EDGE_HUB_MODULE_NAME.to_string(),
        other => other.to_string(),
    }
}
