//! HomeMatic direct link backup and restore
//!
//! This crate provides the link reconciliation engine and everything around it:
//! - Devices and links of a controller (Network, Device, Link)
//! - Parameter metadata cached per device type (DescriptorCache)
//! - Per-parameter write validation (decide)
//! - Reconciling a proposed paramset with the live one (UpdatePlan)
//! - Deduplicated backup documents and their JSON file format
//! - Restoring a backup entry by entry (RestoreReport)
//!
//! All remote calls go through the `HomematicRpc` trait of `hm-rpc`. Dry-run
//! is the default everywhere a mutation can happen.

pub mod error;

pub mod device;
pub mod link;
pub mod metadata;
pub mod validator;
pub mod reconcile;
pub mod network;
pub mod dedup;
pub mod backup;
pub mod restore;
pub mod table;

// Re-export main types
pub use error::{BackupError, BackupResult, LinkError, LinkResult};

pub use device::{Device, DeviceKind, DeviceNames};
pub use link::Link;
pub use metadata::DescriptorCache;
pub use validator::{decide, Decision, ValidationError};
pub use reconcile::{KeyDecision, UpdatePlan};
pub use network::{DeviceMap, Network, CREATED_LINK_DESCRIPTION};
pub use dedup::{BackupBuilder, ParamsetRecord, ParamsetTable};
pub use backup::{
    read_backup_file, write_backup_file, write_text_file, BackupDocument, LinkBackupEntry,
};
pub use restore::{EntryOutcome, RestoreReport};
pub use table::{device_list_text, LinkTable};
