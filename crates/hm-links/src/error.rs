//! Error types for link operations

use hm_rpc::RpcError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors that abort the processing of one link
///
/// Per-parameter rejections are not errors of this kind; they are reported as
/// [`crate::ValidationError`] inside the update plan and never abort a link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// A remote call failed. The original fault is kept as the source.
    #[error("communication error: {0}")]
    Communication(#[from] RpcError),

    /// Backup and live network do not fit together
    #[error("structural error: {0}")]
    Structural(String),
}

impl LinkError {
    pub fn structural(msg: impl Into<String>) -> Self {
        LinkError::Structural(msg.into())
    }

    pub fn is_communication(&self) -> bool {
        matches!(self, LinkError::Communication(_))
    }
}

/// Result type for backup file operations
pub type BackupResult<T> = Result<T, BackupError>;

/// Errors reading or writing backup documents
#[derive(Debug, Error)]
pub enum BackupError {
    /// Failed to read or write a file
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backup text is not a valid backup document
    #[error("error while reading {source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A document part could not be encoded
    #[error("failed to encode backup: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Target exists and overwriting was not allowed
    #[error("file {path} exists. Use the overwrite option if you want to overwrite it")]
    FileExists { path: PathBuf },

    /// Backup file to read does not exist
    #[error("file {path} does not exist")]
    FileMissing { path: PathBuf },
}
