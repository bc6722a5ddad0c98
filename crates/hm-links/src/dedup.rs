//! Building backup documents with shared paramsets
//!
//! Links with identical receiver paramsets point at the same paramset
//! record. Identity is the compact JSON form of the (sorted) paramset.

use crate::backup::{BackupDocument, LinkBackupEntry};
use crate::error::{LinkError, LinkResult};
use crate::link::Link;
use crate::network::Network;
use hm_core::Paramset;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, instrument};

/// A paramset stored once in a backup, with its id
#[derive(Debug, Clone, PartialEq)]
pub struct ParamsetRecord {
    pub id: String,
    pub paramset: Paramset,
}

/// Deduplicating store of paramsets
#[derive(Debug, Default)]
pub struct ParamsetTable {
    ids: HashMap<String, String>,
    records: BTreeMap<String, Paramset>,
}

fn canonical_key(paramset: &Paramset) -> serde_json::Result<String> {
    serde_json::to_string(paramset)
}

impl ParamsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `paramset`, registering it under a new id if it is not stored yet
    ///
    /// New ids are the smallest non-negative integer not in use.
    pub fn intern(&mut self, paramset: &Paramset) -> serde_json::Result<String> {
        let key = canonical_key(paramset)?;
        if let Some(id) = self.ids.get(&key) {
            return Ok(id.clone());
        }
        let id = (0usize..)
            .map(|n| n.to_string())
            .find(|candidate| !self.records.contains_key(candidate))
            .unwrap_or_default();
        self.ids.insert(key, id.clone());
        self.records.insert(id.clone(), paramset.clone());
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = ParamsetRecord> + '_ {
        self.records.iter().map(|(id, paramset)| ParamsetRecord {
            id: id.clone(),
            paramset: paramset.clone(),
        })
    }

    pub fn into_map(self) -> BTreeMap<String, Paramset> {
        self.records
    }
}

/// Collects links and their paramsets into a [`BackupDocument`]
#[derive(Debug, Default)]
pub struct BackupBuilder {
    table: ParamsetTable,
    entries: Vec<LinkBackupEntry>,
}

impl BackupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, link: &Link, paramset: &Paramset) -> serde_json::Result<&LinkBackupEntry> {
        let psetid = self.table.intern(paramset)?;
        self.entries.push(LinkBackupEntry {
            delete: false,
            psetid,
            description: link.label(),
            sender: link.sender().address().to_string(),
            receiver: link.receiver().address().to_string(),
        });
        let idx = self.entries.len() - 1;
        Ok(&self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by paramset id, then label
    pub fn finish(mut self) -> BackupDocument {
        self.entries.sort_by(|a, b| {
            (a.psetid.as_str(), a.description.as_str())
                .cmp(&(b.psetid.as_str(), b.description.as_str()))
        });
        BackupDocument {
            links: self.entries,
            paramsets: self.table.into_map(),
        }
    }
}

impl Network {
    /// Backup of `links`
    ///
    /// Paramsets missing from a link are read from the network. Links whose
    /// paramset cannot be read are left out with an error log.
    #[instrument(skip_all, fields(links = links.len()))]
    pub async fn build_backup(&self, links: &mut [Link]) -> LinkResult<BackupDocument> {
        let mut builder = BackupBuilder::new();

        for link in links.iter_mut() {
            let paramset = match link.paramset(self.rpc(), false).await {
                Ok(paramset) => paramset.clone(),
                Err(e) => {
                    error!(link = %link, error = %e, "Cannot read link paramset, not backed up");
                    continue;
                }
            };
            let entry = builder
                .add(link, &paramset)
                .map_err(|e| LinkError::structural(format!("cannot encode paramset: {}", e)))?;
            debug!(link = %link, psetid = %entry.psetid, "Link added to backup");
        }

        let document = builder.finish();
        info!(
            links = document.links.len(),
            paramsets = document.paramsets.len(),
            "Backup built"
        );
        Ok(document)
    }
}
