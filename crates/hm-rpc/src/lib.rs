//! HomeMatic RPC client
//!
//! The controller (CCU) exposes its device interface over XML-RPC. This crate
//! maps every remote operation the link tools need to one typed method of the
//! [`HomematicRpc`] trait and provides [`XmlRpcClient`], the HTTP
//! implementation of it.
//!
//! Enable the `mock` feature to get [`mock::MockRpc`], an in-memory
//! controller that records every call.

mod client;
mod error;
mod xml;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{ClientOptions, XmlRpcClient};
pub use error::{RpcError, RpcResult};
pub use xml::{decode_response, encode_call};

use async_trait::async_trait;
use hm_core::{
    DeviceAddress, DeviceDescription, LinkInfo, ParamValue, Paramset, ParamsetDescription,
};

/// Operations of the controller's device interface
///
/// One method per remote call. Every call may fail with an [`RpcError`];
/// callers decide whether that aborts their unit of work.
#[async_trait]
pub trait HomematicRpc: Send + Sync {
    /// All devices and channels known to the controller
    async fn list_devices(&self) -> RpcResult<Vec<DeviceDescription>>;

    /// Description of a single device or channel
    async fn get_device_description(&self, address: &DeviceAddress)
        -> RpcResult<DeviceDescription>;

    /// Links involving `address` (all links when `address` is empty)
    ///
    /// `flags` is a combination of [`hm_core::link_query`] constants.
    async fn get_links(&self, address: &str, flags: i32) -> RpcResult<Vec<LinkInfo>>;

    /// Addresses of all link partners of a channel
    async fn get_link_peers(&self, address: &DeviceAddress) -> RpcResult<Vec<DeviceAddress>>;

    /// Read a paramset. `paramset_key` is a paramset name (`MASTER`,
    /// `VALUES`) or, for link paramsets, the peer's address.
    async fn get_paramset(&self, address: &DeviceAddress, paramset_key: &str)
        -> RpcResult<Paramset>;

    /// Write a paramset
    async fn put_paramset(
        &self,
        address: &DeviceAddress,
        paramset_key: &str,
        paramset: &Paramset,
    ) -> RpcResult<()>;

    /// Write a single value of the `VALUES` paramset
    async fn set_value(&self, address: &DeviceAddress, key: &str, value: &ParamValue)
        -> RpcResult<()>;

    /// Create a direct link between two channels
    async fn add_link(
        &self,
        sender: &DeviceAddress,
        receiver: &DeviceAddress,
        name: &str,
        description: &str,
    ) -> RpcResult<()>;

    /// Remove a direct link between two channels
    async fn remove_link(&self, sender: &DeviceAddress, receiver: &DeviceAddress)
        -> RpcResult<()>;

    /// Descriptor table of a paramset
    async fn get_paramset_description(
        &self,
        address: &DeviceAddress,
        paramset_key: &str,
    ) -> RpcResult<ParamsetDescription>;
}
