//! Core types for HomeMatic link handling
//!
//! This crate provides the fundamental types shared by the RPC client and the
//! link reconciliation engine: DeviceAddress, ParamValue, Paramset,
//! ParameterDescriptor and the wire structures returned by the controller.

mod address;
mod descriptor;
mod link_flags;
mod value;
mod wire;

pub use address::{AddressError, DeviceAddress};
pub use descriptor::{
    Operations, ParameterDescriptor, ParameterFlags, ParameterType, ParamsetDescription,
    DISABLED_SENTINEL,
};
pub use link_flags::LinkFlags;
pub use value::{ParamValue, Paramset};
pub use wire::{DeviceDescription, LinkInfo};

/// Well-known paramset names
pub mod paramsets {
    /// Configuration paramset of a device or channel
    pub const MASTER: &str = "MASTER";

    /// Live values of a channel (e.g. `STATE`)
    pub const VALUES: &str = "VALUES";

    /// Schema name used when asking for the description of link paramsets
    pub const LINK: &str = "LINK";
}

/// Flags accepted by `getLinks`
pub mod link_query {
    /// Resolve the link into the group it belongs to
    pub const GROUP: i32 = 0x01;

    /// Include the sender-side paramset in each entry
    pub const SENDER_PARAMSET: i32 = 0x02;

    /// Include the receiver-side paramset in each entry
    pub const RECEIVER_PARAMSET: i32 = 0x04;
}
