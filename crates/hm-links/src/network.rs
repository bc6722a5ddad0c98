//! Network inventory and link mutations

use crate::device::{Device, DeviceNames};
use crate::error::LinkResult;
use crate::link::Link;
use crate::metadata::DescriptorCache;
use crate::reconcile::UpdatePlan;
use hm_core::{link_query, DeviceAddress, LinkFlags, Paramset};
use hm_rpc::HomematicRpc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Description attached to links created by a restore
pub const CREATED_LINK_DESCRIPTION: &str = "Created with hmbackup";

/// Devices of the network, keyed by address
pub type DeviceMap = HashMap<DeviceAddress, Arc<Device>>;

/// Entry point for everything the link tools do with a controller
///
/// Owns the RPC connection, the device names and the descriptor cache of a
/// run. All remote calls are awaited one after another.
pub struct Network {
    rpc: Arc<dyn HomematicRpc>,
    names: DeviceNames,
    descriptors: DescriptorCache,
}

impl Network {
    pub fn new(rpc: Arc<dyn HomematicRpc>, names: DeviceNames) -> Self {
        Self {
            rpc,
            names,
            descriptors: DescriptorCache::new(),
        }
    }

    pub fn rpc(&self) -> &dyn HomematicRpc {
        self.rpc.as_ref()
    }

    pub fn names(&self) -> &DeviceNames {
        &self.names
    }

    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }

    /// All devices and channels the controller knows
    pub async fn devices(&self) -> LinkResult<Vec<Arc<Device>>> {
        let descriptions = self.rpc.list_devices().await?;
        debug!(count = descriptions.len(), "Devices listed");
        Ok(descriptions
            .into_iter()
            .map(|d| Arc::new(Device::new(d, &self.names)))
            .collect())
    }

    pub async fn device_map(&self) -> LinkResult<DeviceMap> {
        Ok(self
            .devices()
            .await?
            .into_iter()
            .map(|d| (d.address().clone(), d))
            .collect())
    }

    /// All links with their receiver paramsets, in a single query
    pub async fn links(&self) -> LinkResult<Vec<Link>> {
        let devices = self.device_map().await?;
        self.links_with(&devices).await
    }

    /// Like [`Network::links`], resolving ends against an existing device map
    pub async fn links_with(&self, devices: &DeviceMap) -> LinkResult<Vec<Link>> {
        let infos = self
            .rpc
            .get_links("", link_query::RECEIVER_PARAMSET)
            .await?;

        let mut links = Vec::with_capacity(infos.len());
        for info in infos {
            let (Some(sender), Some(receiver)) =
                (devices.get(&info.sender), devices.get(&info.receiver))
            else {
                warn!(
                    sender = %info.sender,
                    receiver = %info.receiver,
                    "Link references unknown device, skipping"
                );
                continue;
            };
            links.push(Link::new(
                sender.clone(),
                receiver.clone(),
                info.receiver_paramset,
                info.flags,
            ));
        }
        debug!(count = links.len(), "Links listed");
        Ok(links)
    }

    /// Links found by asking every device for its peers
    ///
    /// Slow, but works with controllers that do not return paramsets from
    /// `getLinks`. Peers whose link paramset cannot be read or is empty are
    /// left out.
    pub async fn links_via_peers(&self) -> LinkResult<Vec<Link>> {
        let mut devices = self.device_map().await?;
        let receivers: Vec<Arc<Device>> = devices.values().cloned().collect();
        let mut links: Vec<Link> = Vec::new();

        for receiver in receivers {
            for peer in self.rpc.get_link_peers(receiver.address()).await? {
                let sender = match devices.get(&peer) {
                    Some(sender) => sender.clone(),
                    None => {
                        let description = self.rpc.get_device_description(&peer).await?;
                        let sender = Arc::new(Device::new(description, &self.names));
                        devices.insert(peer.clone(), sender.clone());
                        sender
                    }
                };

                let paramset = match self
                    .rpc
                    .get_paramset(receiver.address(), sender.address().as_str())
                    .await
                {
                    Ok(paramset) if !paramset.is_empty() => paramset,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!(error = %e, "Link paramset not readable, skipping");
                        continue;
                    }
                };

                let link = Link::new(sender, receiver.clone(), Some(paramset), LinkFlags::empty());
                if !links.contains(&link) {
                    links.push(link);
                }
            }
        }
        Ok(links)
    }

    /// Create `link` on the controller and give it the `proposed` paramset
    ///
    /// When the paramset cannot be read back or applied, the new link is
    /// removed again. In dry-run nothing is called and `None` is returned.
    pub async fn add_link(
        &self,
        link: &mut Link,
        proposed: &Paramset,
        dry_run: bool,
    ) -> LinkResult<Option<UpdatePlan>> {
        if dry_run {
            info!("Would add link to network: \"{}\"", link);
            return Ok(None);
        }

        info!("Add link to network: \"{}\"", link);
        self.rpc
            .add_link(
                link.sender().address(),
                link.receiver().address(),
                "",
                CREATED_LINK_DESCRIPTION,
            )
            .await?;

        let applied = match link.paramset(self.rpc(), true).await {
            Ok(_) => self.reconcile(link, proposed, false).await,
            Err(e) => Err(e),
        };

        match applied {
            Ok(plan) => Ok(Some(plan)),
            Err(e) => {
                error!(error = %e, "Failure while adding link, reverting");
                if let Err(rollback) = self
                    .rpc
                    .remove_link(link.sender().address(), link.receiver().address())
                    .await
                {
                    error!(error = %rollback, "Reverting link creation failed");
                }
                Err(e)
            }
        }
    }

    /// Remove `link` from the controller
    pub async fn delete_link(&self, link: &Link, dry_run: bool) -> LinkResult<()> {
        if dry_run {
            info!("Would delete link from network: \"{}\"", link);
            return Ok(());
        }

        info!("Delete link from network: \"{}\"", link);
        self.rpc
            .remove_link(link.sender().address(), link.receiver().address())
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("names", &self.names.len())
            .field("descriptors", &self.descriptors.len())
            .finish()
    }
}
