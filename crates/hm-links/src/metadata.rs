//! Parameter metadata provider
//!
//! Paramset descriptions are a property of the device type, not of the
//! device instance, so they are cached per (device type, paramset name).
//! The cache lives as long as the [`DescriptorCache`] value; it is created
//! once per run and only bypassed by an explicit refresh.

use crate::device::Device;
use crate::error::LinkResult;
use dashmap::DashMap;
use hm_core::ParamsetDescription;
use hm_rpc::HomematicRpc;
use std::sync::Arc;
use tracing::debug;

/// Cache of paramset descriptions keyed by device type
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: DashMap<(String, String), Arc<ParamsetDescription>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor table of `paramset_name` for the type of `device`
    ///
    /// Fetched from the network on first use of a device type, or when
    /// `force_refresh` is set.
    pub async fn descriptors(
        &self,
        rpc: &dyn HomematicRpc,
        device: &Device,
        paramset_name: &str,
        force_refresh: bool,
    ) -> LinkResult<Arc<ParamsetDescription>> {
        let key = (device.device_type().to_string(), paramset_name.to_string());

        if !force_refresh {
            if let Some(cached) = self.entries.get(&key) {
                debug!(
                    device_type = %key.0,
                    paramset_name,
                    "Paramset description from cache"
                );
                return Ok(cached.clone());
            }
        }

        debug!(
            device_type = %key.0,
            paramset_name,
            "Reading paramset description from network"
        );
        let description = Arc::new(
            rpc.get_paramset_description(device.address(), paramset_name)
                .await?,
        );
        self.entries.insert(key, description.clone());
        Ok(description)
    }

    /// Number of cached descriptor tables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
