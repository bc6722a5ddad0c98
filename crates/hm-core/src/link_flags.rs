//! Link state flags reported by `getLinks`

use bitflags::bitflags;
use serde::{Deserialize, Deserializer};

bitflags! {
    /// `FLAGS` field of a link entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LinkFlags: u32 {
        /// The sender does not know about the link any more
        const SENDER_BROKEN = 0x01;
        /// The receiver does not know about the link any more
        const RECEIVER_BROKEN = 0x02;
    }
}

impl LinkFlags {
    pub fn sender_broken(&self) -> bool {
        self.contains(LinkFlags::SENDER_BROKEN)
    }

    pub fn receiver_broken(&self) -> bool {
        self.contains(LinkFlags::RECEIVER_BROKEN)
    }
}

impl<'de> Deserialize<'de> for LinkFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(LinkFlags::from_bits_retain(bits))
    }
}
