//! Module connection strings
//!
//! Non-hub modules reach the backend by tunnelling through the local hub,
//! so their connection strings carry the gateway host name. The hub itself
//! connects directly.

use serde::{Serialize, Serializer};

use super::naming::EDGE_HUB_IDENTITY_NAME;
use super::types::{Identity, IdentityError};

/// Connection string a module uses to authenticate to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConnectionString {
    host_name: String,
    device_id: String,
    module_id: String,
    gateway_host_name: Option<String>,
}

impl ModuleConnectionString {
    /// Connection string for a module connecting directly to the hub
    pub fn new(
        host_name: impl Into<String>,
        device_id: impl Into<String>,
        module_id: impl Into<String>,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            device_id: device_id.into(),
            module_id: module_id.into(),
            gateway_host_name: None,
        }
    }

    /// Route the connection through a gateway
    pub fn with_gateway_host_name(mut self, gateway_host_name: impl Into<String>) -> Self {
        self.gateway_host_name = Some(gateway_host_name.into());
        self
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn gateway_host_name(&self) -> Option<&str> {
        self.gateway_host_name.as_deref()
    }
}

impl std::fmt::Display for ModuleConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HostName={};DeviceId={};ModuleId={}",
            self.host_name, self.device_id, self.module_id
        )?;
        if let Some(gateway) = &self.gateway_host_name {
            write!(f, ";GatewayHostName={}", gateway)?;
        }
        Ok(())
    }
}

impl Serialize for ModuleConnectionString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn require(value: &str, name: &str) -> Result<String, IdentityError> {
    if value.trim().is_empty() {
        return Err(IdentityError::Configuration(format!("{} must not be blank", name)));
    }
    Ok(value.to_string())
}

/// Builds connection strings for modules of one device
#[derive(Debug, Clone)]
pub struct ModuleConnectionStringBuilder {
    iothub_host_name: String,
    device_id: String,
}

impl ModuleConnectionStringBuilder {
    /// Fails when either value is blank
    pub fn new(iothub_host_name: &str, device_id: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            iothub_host_name: require(iothub_host_name, "iothub_host_name")?,
            device_id: require(device_id, "device_id")?,
        })
    }

    /// Connection string for `module_id` without gateway routing
    pub fn create(&self, module_id: &str) -> ModuleConnectionString {
        ModuleConnectionString::new(&self.iothub_host_name, &self.device_id, module_id)
    }
}

/// Picks the right connection string shape for an identity
#[derive(Debug, Clone)]
pub struct CredentialSelector {
    builder: ModuleConnectionStringBuilder,
    gateway_host_name: String,
}

impl CredentialSelector {
    /// Fails when the gateway host name is blank
    pub fn new(
        builder: ModuleConnectionStringBuilder,
        gateway_host_name: &str,
    ) -> Result<Self, IdentityError> {
        Ok(Self {
            builder,
            gateway_host_name: require(gateway_host_name, "gateway_host_name")?,
        })
    }

    pub fn gateway_host_name(&self) -> &str {
        &self.gateway_host_name
    }

    /// Connection string for an identity; only the hub skips the gateway
    pub fn select(&self, identity: &Identity) -> ModuleConnectionString {
        let credential = self.builder.create(&identity.module_id);
        if is_edge_hub(&identity.module_id) {
            credential
        } else {
            credential.with_gateway_host_name(&self.gateway_host_name)
        }
    }
}

fn is_edge_hub(module_id: &str) -> bool {
    module_id.eq_ignore_ascii_case(EDGE_HUB_IDENTITY_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> CredentialSelector {
        let builder = ModuleConnectionStringBuilder::new("hub.azure-devices.net", "edge-device").unwrap();
        CredentialSelector::new(builder, "edge-gateway.local").unwrap()
    }

    #[test]
    fn test_connection_string_format() {
        let cs = ModuleConnectionString::new("hub.azure-devices.net", "edge-device", "tempSensor");
        assert_eq!(
            cs.to_string(),
            "HostName=hub.azure-devices.net;DeviceId=edge-device;ModuleId=tempSensor"
        );

        let cs = cs.with_gateway_host_name("edge-gateway.local");
        assert_eq!(
            cs.to_string(),
            "HostName=hub.azure-devices.net;DeviceId=edge-device;ModuleId=tempSensor;GatewayHostName=edge-gateway.local"
        );
    }

    #[test]
    fn test_hub_has_no_gateway() {
        let credential = selector().select(&Identity::new("$edgeHub", "IotEdge"));
        assert_eq!(credential.gateway_host_name(), None);
        assert_eq!(credential.module_id(), "$edgeHub");

        // Hub match ignores case
        let credential = selector().select(&Identity::new("$EDGEHUB", "IotEdge"));
        assert_eq!(credential.gateway_host_name(), None);
    }

    #[test]
    fn test_other_modules_use_gateway() {
        for module_id in ["$edgeAgent", "tempSensor", "edgeHub"] {
            let credential = selector().select(&Identity::new(module_id, "IotEdge"));
            assert_eq!(credential.gateway_host_name(), Some("edge-gateway.local"), "{module_id}");
        }
    }

    #[test]
    fn test_blank_configuration_is_rejected() {
        assert!(matches!(
            ModuleConnectionStringBuilder::new(" ", "edge-device"),
            Err(IdentityError::Configuration(_))
        ));
        assert!(matches!(
            ModuleConnectionStringBuilder::new("hub.azure-devices.net", ""),
            Err(IdentityError::Configuration(_))
        ));

        let builder = ModuleConnectionStringBuilder::new("hub.azure-devices.net", "edge-device").unwrap();
        assert!(matches!(
            CredentialSelector::new(builder, "\t"),
            Err(IdentityError::Configuration(_))
        ));
    }

    #[test]
    fn test_serializes_as_string() {
        let cs = ModuleConnectionString::new("h", "d", "m");
        assert_eq!(serde_json::to_string(&cs).unwrap(), r#""HostName=h;DeviceId=d;ModuleId=m""#);
    }
}
