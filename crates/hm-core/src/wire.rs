//! Structures returned by the controller's device and link calls

use crate::address::DeviceAddress;
use crate::link_flags::LinkFlags;
use crate::value::Paramset;
use serde::Deserialize;

/// Entry of `listDevices` / result of `getDeviceDescription`
///
/// Only the fields this crate needs are modelled; everything else the
/// controller sends is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DeviceDescription {
    pub address: DeviceAddress,
    #[serde(rename = "TYPE")]
    pub device_type: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub parent_type: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub paramsets: Vec<String>,
    #[serde(default)]
    pub firmware: Option<String>,
    #[serde(default)]
    pub flags: u32,
}

impl DeviceDescription {
    pub fn new(address: DeviceAddress, device_type: impl Into<String>) -> Self {
        Self {
            address,
            device_type: device_type.into(),
            parent: None,
            parent_type: None,
            children: Vec::new(),
            paramsets: Vec::new(),
            firmware: None,
            flags: 0,
        }
    }
}

/// Entry of `getLinks`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LinkInfo {
    pub sender: DeviceAddress,
    pub receiver: DeviceAddress,
    #[serde(default)]
    pub flags: LinkFlags,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Present when the query asked for receiver paramsets
    #[serde(default)]
    pub receiver_paramset: Option<Paramset>,
}
