//! In-memory controller for tests
//!
//! `MockRpc` keeps devices, links, link paramsets and paramset descriptions in
//! memory, behaves like the controller for the calls the link tools make and
//! records every call so tests can assert on remote side effects.

use crate::error::{RpcError, RpcResult};
use crate::HomematicRpc;
use async_trait::async_trait;
use hm_core::{
    link_query, DeviceAddress, DeviceDescription, LinkFlags, LinkInfo, ParamValue, Paramset,
    ParamsetDescription,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Methods that change state on the controller
pub const MUTATING_METHODS: &[&str] = &["putParamset", "setValue", "addLink", "removeLink"];

/// A call as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub args: Vec<String>,
}

impl RecordedCall {
    pub fn is_mutation(&self) -> bool {
        MUTATING_METHODS.contains(&self.method)
    }
}

#[derive(Debug, Clone)]
struct MockLink {
    sender: DeviceAddress,
    receiver: DeviceAddress,
    flags: LinkFlags,
    paramset: Paramset,
}

#[derive(Default)]
struct MockState {
    devices: Vec<DeviceDescription>,
    links: Vec<MockLink>,
    /// device type -> paramset name -> description
    descriptions: HashMap<String, HashMap<String, ParamsetDescription>>,
    /// (address, paramset name) -> paramset
    paramsets: HashMap<(DeviceAddress, String), Paramset>,
    /// method -> fault message
    failures: HashMap<String, String>,
    calls: Vec<RecordedCall>,
}

/// In-memory controller double
#[derive(Default)]
pub struct MockRpc {
    state: Mutex<MockState>,
}

fn address(s: &str) -> DeviceAddress {
    DeviceAddress::new(s).expect("invalid address in test fixture")
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device or channel
    pub fn with_device(self, addr: &str, device_type: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .devices
            .push(DeviceDescription::new(address(addr), device_type));
        self
    }

    /// Register an intact link with its receiver paramset
    pub fn with_link(self, sender: &str, receiver: &str, paramset: Paramset) -> Self {
        self.with_flagged_link(sender, receiver, LinkFlags::empty(), paramset)
    }

    pub fn with_flagged_link(
        self,
        sender: &str,
        receiver: &str,
        flags: LinkFlags,
        paramset: Paramset,
    ) -> Self {
        self.state.lock().unwrap().links.push(MockLink {
            sender: address(sender),
            receiver: address(receiver),
            flags,
            paramset,
        });
        self
    }

    /// Register the description of `paramset_name` for all devices of a type
    pub fn with_description(
        self,
        device_type: &str,
        paramset_name: &str,
        description: ParamsetDescription,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .descriptions
            .entry(device_type.to_string())
            .or_default()
            .insert(paramset_name.to_string(), description);
        self
    }

    /// Register a named paramset (e.g. `VALUES`) of a channel
    pub fn with_paramset(self, addr: &str, paramset_name: &str, paramset: Paramset) -> Self {
        self.state
            .lock()
            .unwrap()
            .paramsets
            .insert((address(addr), paramset_name.to_string()), paramset);
        self
    }

    /// Make every call of `method` fail with a fault
    pub fn fail_on(&self, method: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(method.to_string(), message.to_string());
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls of a single method
    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    /// Calls that changed controller state
    pub fn mutations(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.is_mutation()).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Current receiver paramset of a link, if the link exists
    pub fn link_paramset(&self, sender: &str, receiver: &str) -> Option<Paramset> {
        let state = self.state.lock().unwrap();
        state
            .links
            .iter()
            .find(|l| l.sender.as_str() == sender && l.receiver.as_str() == receiver)
            .map(|l| l.paramset.clone())
    }

    pub fn link_count(&self) -> usize {
        self.state.lock().unwrap().links.len()
    }

    fn record(&self, method: &'static str, args: &[&str]) -> RpcResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method,
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        match state.failures.get(method) {
            Some(message) => Err(fault(method, message)),
            None => Ok(()),
        }
    }
}

fn fault(method: &str, message: &str) -> RpcError {
    RpcError::Fault {
        method: method.to_string(),
        code: -1,
        message: message.to_string(),
    }
}

/// Paramset a fresh link starts with: the DEFAULT of every described parameter
fn default_paramset(description: Option<&ParamsetDescription>) -> Paramset {
    description
        .map(|d| {
            d.iter()
                .filter_map(|(k, v)| v.default.clone().map(|def| (k.clone(), def)))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl HomematicRpc for MockRpc {
    async fn list_devices(&self) -> RpcResult<Vec<DeviceDescription>> {
        self.record("listDevices", &[])?;
        Ok(self.state.lock().unwrap().devices.clone())
    }

    async fn get_device_description(
        &self,
        addr: &DeviceAddress,
    ) -> RpcResult<DeviceDescription> {
        self.record("getDeviceDescription", &[addr.as_str()])?;
        self.state
            .lock()
            .unwrap()
            .devices
            .iter()
            .find(|d| &d.address == addr)
            .cloned()
            .ok_or_else(|| fault("getDeviceDescription", "Unknown instance"))
    }

    async fn get_links(&self, addr: &str, flags: i32) -> RpcResult<Vec<LinkInfo>> {
        let flags_arg = flags.to_string();
        self.record("getLinks", &[addr, flags_arg.as_str()])?;
        let state = self.state.lock().unwrap();
        Ok(state
            .links
            .iter()
            .filter(|l| addr.is_empty() || l.sender.as_str() == addr || l.receiver.as_str() == addr)
            .map(|l| LinkInfo {
                sender: l.sender.clone(),
                receiver: l.receiver.clone(),
                flags: l.flags,
                name: Some(String::new()),
                description: Some(String::new()),
                receiver_paramset: (flags & link_query::RECEIVER_PARAMSET != 0)
                    .then(|| l.paramset.clone()),
            })
            .collect())
    }

    async fn get_link_peers(&self, addr: &DeviceAddress) -> RpcResult<Vec<DeviceAddress>> {
        self.record("getLinkPeers", &[addr.as_str()])?;
        let state = self.state.lock().unwrap();
        Ok(state
            .links
            .iter()
            .filter_map(|l| {
                if &l.receiver == addr {
                    Some(l.sender.clone())
                } else if &l.sender == addr {
                    Some(l.receiver.clone())
                } else {
                    None
                }
            })
            .collect())
    }

    async fn get_paramset(&self, addr: &DeviceAddress, paramset_key: &str) -> RpcResult<Paramset> {
        self.record("getParamset", &[addr.as_str(), paramset_key])?;
        let state = self.state.lock().unwrap();
        if let Some(link) = state
            .links
            .iter()
            .find(|l| &l.receiver == addr && l.sender.as_str() == paramset_key)
        {
            return Ok(link.paramset.clone());
        }
        state
            .paramsets
            .get(&(addr.clone(), paramset_key.to_string()))
            .cloned()
            .ok_or_else(|| fault("getParamset", "Unknown paramset"))
    }

    async fn put_paramset(
        &self,
        addr: &DeviceAddress,
        paramset_key: &str,
        paramset: &Paramset,
    ) -> RpcResult<()> {
        self.record("putParamset", &[addr.as_str(), paramset_key])?;
        let mut state = self.state.lock().unwrap();
        if let Some(link) = state
            .links
            .iter_mut()
            .find(|l| &l.receiver == addr && l.sender.as_str() == paramset_key)
        {
            link.paramset.extend(paramset.clone());
            return Ok(());
        }
        match state
            .paramsets
            .get_mut(&(addr.clone(), paramset_key.to_string()))
        {
            Some(existing) => {
                existing.extend(paramset.clone());
                Ok(())
            }
            None => Err(fault("putParamset", "Unknown paramset")),
        }
    }

    async fn set_value(&self, addr: &DeviceAddress, key: &str, value: &ParamValue) -> RpcResult<()> {
        let value_arg = value.to_string();
        self.record("setValue", &[addr.as_str(), key, value_arg.as_str()])?;
        self.state
            .lock()
            .unwrap()
            .paramsets
            .entry((addr.clone(), "VALUES".to_string()))
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn add_link(
        &self,
        sender: &DeviceAddress,
        receiver: &DeviceAddress,
        name: &str,
        description: &str,
    ) -> RpcResult<()> {
        self.record(
            "addLink",
            &[sender.as_str(), receiver.as_str(), name, description],
        )?;
        let mut state = self.state.lock().unwrap();
        if state
            .links
            .iter()
            .any(|l| &l.sender == sender && &l.receiver == receiver)
        {
            return Err(fault("addLink", "Link already exists"));
        }
        let receiver_type = state
            .devices
            .iter()
            .find(|d| &d.address == receiver)
            .map(|d| d.device_type.clone())
            .ok_or_else(|| fault("addLink", "Unknown instance"))?;
        let paramset = default_paramset(
            state
                .descriptions
                .get(&receiver_type)
                .and_then(|d| d.get(hm_core::paramsets::LINK)),
        );
        state.links.push(MockLink {
            sender: sender.clone(),
            receiver: receiver.clone(),
            flags: LinkFlags::empty(),
            paramset,
        });
        Ok(())
    }

    async fn remove_link(&self, sender: &DeviceAddress, receiver: &DeviceAddress) -> RpcResult<()> {
        self.record("removeLink", &[sender.as_str(), receiver.as_str()])?;
        let mut state = self.state.lock().unwrap();
        let before = state.links.len();
        state
            .links
            .retain(|l| !(&l.sender == sender && &l.receiver == receiver));
        if state.links.len() == before {
            return Err(fault("removeLink", "Unknown link"));
        }
        Ok(())
    }

    async fn get_paramset_description(
        &self,
        addr: &DeviceAddress,
        paramset_key: &str,
    ) -> RpcResult<ParamsetDescription> {
        self.record("getParamsetDescription", &[addr.as_str(), paramset_key])?;
        let state = self.state.lock().unwrap();
        state
            .devices
            .iter()
            .find(|d| &d.address == addr)
            .and_then(|d| state.descriptions.get(&d.device_type))
            .and_then(|by_name| by_name.get(paramset_key))
            .cloned()
            .ok_or_else(|| fault("getParamsetDescription", "Unknown paramset"))
    }
}
