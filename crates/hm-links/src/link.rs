//! Direct links between two channels

use crate::device::Device;
use crate::error::LinkResult;
use hm_core::{LinkFlags, Paramset};
use hm_rpc::HomematicRpc;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

const BROKEN_MARKER: &str = "(*)";

/// A sender → receiver link with a snapshot of the receiver paramset
///
/// Two links are equal when they connect the same sender and receiver
/// addresses; flags and paramset content do not take part in equality.
#[derive(Debug, Clone)]
pub struct Link {
    sender: Arc<Device>,
    receiver: Arc<Device>,
    flags: LinkFlags,
    receiver_paramset: Option<Paramset>,
}

impl Link {
    pub fn new(
        sender: Arc<Device>,
        receiver: Arc<Device>,
        receiver_paramset: Option<Paramset>,
        flags: LinkFlags,
    ) -> Self {
        if receiver_paramset.is_none() {
            debug!("{} without paramset", Self::format_ends(&sender, &receiver, flags));
        }
        Self {
            sender,
            receiver,
            flags,
            receiver_paramset,
        }
    }

    pub fn sender(&self) -> &Arc<Device> {
        &self.sender
    }

    pub fn receiver(&self) -> &Arc<Device> {
        &self.receiver
    }

    pub fn flags(&self) -> LinkFlags {
        self.flags
    }

    pub fn sender_broken(&self) -> bool {
        self.flags.sender_broken()
    }

    pub fn receiver_broken(&self) -> bool {
        self.flags.receiver_broken()
    }

    /// Cached receiver paramset, if it has been fetched
    pub fn cached_paramset(&self) -> Option<&Paramset> {
        self.receiver_paramset.as_ref()
    }

    pub(crate) fn set_cached_paramset(&mut self, paramset: Paramset) {
        self.receiver_paramset = Some(paramset);
    }

    /// Receiver paramset of the link, read from the network when it has not
    /// been fetched yet or when `reread` is set
    pub async fn paramset(
        &mut self,
        rpc: &dyn HomematicRpc,
        reread: bool,
    ) -> LinkResult<&Paramset> {
        if reread || self.receiver_paramset.is_none() {
            debug!(link = %self, reread, "Reading receiver paramset from network");
            let paramset = rpc
                .get_paramset(self.receiver.address(), self.sender.address().as_str())
                .await?;
            self.receiver_paramset = Some(paramset);
        } else {
            debug!(link = %self, "Receiver paramset from cache");
        }
        Ok(self.receiver_paramset.get_or_insert_with(Paramset::new))
    }

    /// Human readable label: display names with `(*)` after a broken side,
    /// padded so that labels of a backup line up
    pub fn label(&self) -> String {
        let mut sender = self.sender.display_name().to_string();
        if self.sender_broken() {
            sender.push_str(BROKEN_MARKER);
        }
        let mut receiver = self.receiver.display_name().to_string();
        if self.receiver_broken() {
            receiver.push_str(BROKEN_MARKER);
        }
        format!("{:<40} -> {:<40}", sender, receiver)
    }

    fn format_ends(sender: &Device, receiver: &Device, flags: LinkFlags) -> String {
        format!(
            "{}{} -> {}{}",
            sender.address(),
            if flags.sender_broken() { BROKEN_MARKER } else { "" },
            receiver.address(),
            if flags.receiver_broken() { BROKEN_MARKER } else { "" },
        )
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.sender.address() == other.sender.address()
            && self.receiver.address() == other.receiver.address()
    }
}

impl Eq for Link {}

impl Hash for Link {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sender.address().hash(state);
        self.receiver.address().hash(state);
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::format_ends(&self.sender, &self.receiver, self.flags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceNames;
    use hm_core::{DeviceDescription, ParamValue};
    use hm_rpc::mock::MockRpc;
    use std::collections::HashSet;

    fn device(address: &str, device_type: &str, names: &DeviceNames) -> Arc<Device> {
        Arc::new(Device::new(
            DeviceDescription::new(address.parse().unwrap(), device_type),
            names,
        ))
    }

    fn pset(value: i64) -> Paramset {
        Paramset::from([("STATE".to_string(), ParamValue::Integer(value))])
    }

    #[test]
    fn test_equality_ignores_paramset_and_flags() {
        let names = DeviceNames::new();
        let a = device("A:1", "KEY", &names);
        let b = device("B:1", "SWITCH", &names);

        let l1 = Link::new(a.clone(), b.clone(), Some(pset(0)), LinkFlags::empty());
        let l2 = Link::new(a.clone(), b.clone(), Some(pset(1)), LinkFlags::SENDER_BROKEN);
        let reversed = Link::new(b, a, Some(pset(0)), LinkFlags::empty());

        assert_eq!(l1, l2);
        assert_ne!(l1, reversed);

        let set: HashSet<Link> = [l1, l2, reversed].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_and_label_mark_broken_sides() {
        let mut names = DeviceNames::new();
        names.insert("A:1", "Hall button");
        let a = device("A:1", "KEY", &names);
        let b = device("B:1", "SWITCH", &names);

        let link = Link::new(a, b, None, LinkFlags::RECEIVER_BROKEN);
        assert_eq!(link.to_string(), "A:1 -> B:1(*)");

        let label = link.label();
        assert!(label.starts_with("Hall button "));
        assert!(label.contains(" -> B:1(*)"));
        assert_eq!(label.len(), 40 + 4 + 40);
    }

    #[tokio::test]
    async fn test_paramset_fetch_and_cache() {
        let rpc = MockRpc::new().with_link("A:1", "B:1", pset(3));
        let names = DeviceNames::new();
        let mut link = Link::new(
            device("A:1", "KEY", &names),
            device("B:1", "SWITCH", &names),
            None,
            LinkFlags::empty(),
        );

        assert_eq!(link.paramset(&rpc, false).await.unwrap(), &pset(3));
        link.paramset(&rpc, false).await.unwrap();
        assert_eq!(rpc.calls_to("getParamset").len(), 1);
        assert_eq!(rpc.calls()[0].args, vec!["B:1", "A:1"]);

        link.paramset(&rpc, true).await.unwrap();
        assert_eq!(rpc.calls_to("getParamset").len(), 2);
    }
}
