//! Backup document format
//!
//! A backup is a JSON object with a `Linklist` (one entry per link) and a
//! `Paramsets` map from paramset id to paramset. The text layout puts every
//! entry on its own line so that backups diff well and can be edited by hand,
//! e.g. to flag a link for deletion.

use crate::error::{BackupError, BackupResult};
use hm_core::Paramset;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// One link of a backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBackupEntry {
    /// Remove this link on restore
    #[serde(default)]
    pub delete: bool,
    /// Id of the receiver paramset in [`BackupDocument::paramsets`]
    #[serde(deserialize_with = "psetid_from_string_or_int")]
    pub psetid: String,
    /// Human readable label, ignored on restore
    #[serde(rename = "desc", default)]
    pub description: String,
    pub sender: String,
    pub receiver: String,
}

/// A complete link backup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(rename = "Linklist")]
    pub links: Vec<LinkBackupEntry>,
    #[serde(rename = "Paramsets")]
    pub paramsets: BTreeMap<String, Paramset>,
}

fn psetid_from_string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

impl BackupDocument {
    /// Paramset referenced by `entry`, if the document has it
    pub fn paramset_of(&self, entry: &LinkBackupEntry) -> Option<&Paramset> {
        self.paramsets.get(&entry.psetid)
    }

    /// Serialize with one link entry and one paramset per line
    pub fn to_json_string(&self) -> BackupResult<String> {
        let mut out = String::from("{\"Linklist\": [");
        for (idx, entry) in self.links.iter().enumerate() {
            let sep = if idx + 1 < self.links.len() { "," } else { "" };
            let _ = write!(out, "\n    {}{}", serde_json::to_string(entry)?, sep);
        }
        out.push_str("\n],\"Paramsets\": {");
        for (idx, (id, paramset)) in self.paramsets.iter().enumerate() {
            let sep = if idx + 1 < self.paramsets.len() { "," } else { "" };
            let _ = write!(
                out,
                "\n    {}:{}{}",
                serde_json::to_string(id)?,
                serde_json::to_string(paramset)?,
                sep
            );
        }
        out.push_str("\n}}\n");
        Ok(out)
    }

    /// Parse backup text; `source_name` names the input in errors
    pub fn from_json_str(text: &str, source_name: &str) -> BackupResult<Self> {
        serde_json::from_str(text).map_err(|source| BackupError::Parse {
            source_name: source_name.to_string(),
            source,
        })
    }
}

/// Write `text` to `path`, refusing to replace an existing file unless
/// `overwrite` is set. Missing parent directories are created.
pub fn write_text_file(path: &Path, text: &str, overwrite: bool) -> BackupResult<()> {
    if path.exists() {
        if !overwrite {
            return Err(BackupError::FileExists {
                path: path.to_path_buf(),
            });
        }
        warn!(path = %path.display(), "File exists, overwriting");
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            debug!(dir = %parent.display(), "Creating directory");
            fs::create_dir_all(parent).map_err(|source| BackupError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, text).map_err(|source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a backup document to `path`
pub fn write_backup_file(path: &Path, document: &BackupDocument, overwrite: bool) -> BackupResult<()> {
    let text = document.to_json_string()?;
    write_text_file(path, &text, overwrite)?;
    info!(
        path = %path.display(),
        links = document.links.len(),
        "Backup written"
    );
    Ok(())
}

/// Read a backup document from `path`
pub fn read_backup_file(path: &Path) -> BackupResult<BackupDocument> {
    if !path.is_file() {
        return Err(BackupError::FileMissing {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = BackupDocument::from_json_str(&text, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        links = document.links.len(),
        paramsets = document.paramsets.len(),
        "Backup read"
    );
    Ok(document)
}
