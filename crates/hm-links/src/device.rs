//! Devices as seen by the link tools

use crate::error::{LinkError, LinkResult};
use dashmap::DashMap;
use hm_core::{paramsets, DeviceAddress, DeviceDescription, ParamValue, Paramset};
use hm_rpc::HomematicRpc;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Display names of devices, keyed by address
///
/// Read from the user's name file (a JSON object `address -> name`).
#[derive(Debug, Clone, Default)]
pub struct DeviceNames(HashMap<String, String>);

impl DeviceNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a name file's content
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }

    pub fn insert(&mut self, address: impl Into<String>, name: impl Into<String>) {
        self.0.insert(address.into(), name.into());
    }

    pub fn get(&self, address: &DeviceAddress) -> Option<&str> {
        self.0.get(address.as_str()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Closed set of device kinds with specific capabilities
///
/// Chosen once from the type tag; unknown tags map to `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Generic,
    /// Wired two-channel DIN rail switch actuator (HMW-LC-Sw2-DR)
    Sw2Dr,
    /// Switch actuator channel
    Switch,
    /// Push button channel
    Key,
}

impl DeviceKind {
    pub fn from_type(device_type: &str) -> Self {
        match device_type {
            "HMW-LC-Sw2-DR" => DeviceKind::Sw2Dr,
            "SWITCH" => DeviceKind::Switch,
            "KEY" => DeviceKind::Key,
            _ => DeviceKind::Generic,
        }
    }

    /// Whether the device exposes a boolean `STATE` value
    pub fn has_switch_state(&self) -> bool {
        matches!(self, DeviceKind::Switch)
    }
}

/// A device or channel of the network
#[derive(Debug)]
pub struct Device {
    description: DeviceDescription,
    name: Option<String>,
    kind: DeviceKind,
    paramsets: DashMap<String, Paramset>,
}

impl Device {
    pub fn new(description: DeviceDescription, names: &DeviceNames) -> Self {
        let name = names.get(&description.address).map(str::to_string);
        let kind = DeviceKind::from_type(&description.device_type);
        Self {
            description,
            name,
            kind,
            paramsets: DashMap::new(),
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.description.address
    }

    pub fn device_type(&self) -> &str {
        &self.description.device_type
    }

    pub fn description(&self) -> &DeviceDescription {
        &self.description
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if known, address otherwise
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.description.address.as_str())
    }

    /// Read a named paramset, from cache unless `reread` is set
    pub async fn paramset(
        &self,
        rpc: &dyn HomematicRpc,
        paramset_name: &str,
        reread: bool,
    ) -> LinkResult<Paramset> {
        if !reread {
            if let Some(cached) = self.paramsets.get(paramset_name) {
                debug!(device = %self.address(), paramset_name, "Paramset from cache");
                return Ok(cached.clone());
            }
        }

        debug!(device = %self.address(), paramset_name, "Reading paramset from network");
        let paramset = rpc.get_paramset(self.address(), paramset_name).await?;
        self.paramsets
            .insert(paramset_name.to_string(), paramset.clone());
        Ok(paramset)
    }

    /// Current on/off state of a switch channel
    pub async fn state(&self, rpc: &dyn HomematicRpc) -> LinkResult<bool> {
        self.require_switch()?;
        let values = self.paramset(rpc, paramsets::VALUES, true).await?;
        values
            .get("STATE")
            .and_then(ParamValue::as_bool)
            .ok_or_else(|| {
                LinkError::structural(format!("{} has no boolean STATE value", self.address()))
            })
    }

    /// Switch a switch channel on or off
    pub async fn set_state(&self, rpc: &dyn HomematicRpc, on: bool) -> LinkResult<()> {
        self.require_switch()?;
        rpc.set_value(self.address(), "STATE", &ParamValue::Bool(on))
            .await?;
        self.paramsets.remove(paramsets::VALUES);
        Ok(())
    }

    fn require_switch(&self) -> LinkResult<()> {
        if self.kind.has_switch_state() {
            Ok(())
        } else {
            Err(LinkError::structural(format!(
                "{} ({}) is not a switch",
                self.address(),
                self.device_type()
            )))
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("");
        match self.kind {
            DeviceKind::Switch => write!(f, "SWITCH: Addr: {} \"{}\"", self.address(), name),
            DeviceKind::Key => write!(f, "KEY: Addr: {} ({})", self.address(), name),
            DeviceKind::Sw2Dr | DeviceKind::Generic => write!(
                f,
                "HomeMatic device {} addr:{} name:\"{}\"",
                self.device_type(),
                self.address(),
                name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hm_rpc::mock::MockRpc;

    fn device(address: &str, device_type: &str, names: &DeviceNames) -> Device {
        Device::new(
            DeviceDescription::new(address.parse().unwrap(), device_type),
            names,
        )
    }

    #[test]
    fn test_kind_from_type_tag() {
        assert_eq!(DeviceKind::from_type("SWITCH"), DeviceKind::Switch);
        assert_eq!(DeviceKind::from_type("KEY"), DeviceKind::Key);
        assert_eq!(DeviceKind::from_type("HMW-LC-Sw2-DR"), DeviceKind::Sw2Dr);
        assert_eq!(DeviceKind::from_type("HM-CC-RT-DN"), DeviceKind::Generic);
    }

    #[test]
    fn test_display_name_falls_back_to_address() {
        let names = DeviceNames::from_json_str(r#"{"LEQ1181007:4": "Kitchen light"}"#).unwrap();
        let named = device("LEQ1181007:4", "SWITCH", &names);
        let unnamed = device("KEQ0000001:1", "KEY", &names);

        assert_eq!(named.display_name(), "Kitchen light");
        assert_eq!(unnamed.display_name(), "KEQ0000001:1");
        assert_eq!(named.to_string(), "SWITCH: Addr: LEQ1181007:4 \"Kitchen light\"");
        assert_eq!(unnamed.to_string(), "KEY: Addr: KEQ0000001:1 ()");
    }

    #[tokio::test]
    async fn test_paramset_cache() {
        let mut values = Paramset::new();
        values.insert("STATE".into(), ParamValue::Bool(false));
        let rpc = MockRpc::new()
            .with_device("LEQ1181007:4", "SWITCH")
            .with_paramset("LEQ1181007:4", "MASTER", values);
        let dev = device("LEQ1181007:4", "SWITCH", &DeviceNames::new());

        dev.paramset(&rpc, "MASTER", false).await.unwrap();
        dev.paramset(&rpc, "MASTER", false).await.unwrap();
        assert_eq!(rpc.calls_to("getParamset").len(), 1);

        dev.paramset(&rpc, "MASTER", true).await.unwrap();
        assert_eq!(rpc.calls_to("getParamset").len(), 2);
    }

    #[tokio::test]
    async fn test_switch_state() {
        let mut values = Paramset::new();
        values.insert("STATE".into(), ParamValue::Bool(false));
        let rpc = MockRpc::new()
            .with_device("LEQ1181007:4", "SWITCH")
            .with_paramset("LEQ1181007:4", "VALUES", values);
        let dev = device("LEQ1181007:4", "SWITCH", &DeviceNames::new());

        assert!(!dev.state(&rpc).await.unwrap());
        dev.set_state(&rpc, true).await.unwrap();
        assert!(dev.state(&rpc).await.unwrap());
        assert_eq!(rpc.calls_to("setValue").len(), 1);
    }

    #[tokio::test]
    async fn test_switch_state_on_key_is_error() {
        let rpc = MockRpc::new();
        let dev = device("KEQ0000001:1", "KEY", &DeviceNames::new());

        let err = dev.state(&rpc).await.unwrap_err();
        assert!(matches!(err, LinkError::Structural(_)));
        assert!(rpc.calls().is_empty());
    }
}
