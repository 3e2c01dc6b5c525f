//! Error types for the metadata gateway

use std::path::PathBuf;
use thiserror::Error;

/// Metadata error types
#[derive(Debug, Error)]
pub enum MetadataError {
    /// File format unreadable or structurally invalid
    #[error("Corrupted metadata in {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    /// Read failed for a reason other than the file itself
    #[error("Read failed for {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// Tool reported a write failure (permission, unsupported format, ...)
    #[error("Write failed for {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    /// Write reported success but the read-back did not match
    #[error("Write not confirmed for {path}: {reason}")]
    Unverified { path: PathBuf, reason: String },

    /// Metadata tool could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Metadata tool did not finish in time
    #[error("Timeout after {seconds}s on {path}")]
    Timeout { path: PathBuf, seconds: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tool output was not the expected JSON
    #[error("Unexpected tool output: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetadataError {
    /// The file itself is unreadable; retrying will not help
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }

    /// A write-side failure the commit protocol may retry
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            Self::Write { .. } | Self::Unverified { .. } | Self::Timeout { .. }
        )
    }
}

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;
