//! Persisted processing status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state stored in the file's own status tag
///
/// `Unprocessed` is never written: it is what a file without a status tag
/// (and without an identifier) is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unprocessed,
    Pending,
    Done,
    Failed,
    Skipped,
}

impl FileStatus {
    /// Value written to the status tag, `None` for `Unprocessed`
    ///
    /// `success`/`retry` keep files tagged by earlier indexer versions readable.
    pub fn tag_value(&self) -> Option<&'static str> {
        match self {
            Self::Unprocessed => None,
            Self::Pending => Some("retry"),
            Self::Done => Some("success"),
            Self::Failed => Some("failed"),
            Self::Skipped => Some("skipped"),
        }
    }

    /// Parse a status tag value, case-insensitively
    ///
    /// Returns `None` for values this indexer does not recognize.
    pub fn from_tag_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" | "done" => Some(Self::Done),
            "failed" | "fail" => Some(Self::Failed),
            "retry" | "pending" => Some(Self::Pending),
            "skipped" | "skip" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Terminal states a normal run leaves alone
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unprocessed => write!(f, "unprocessed"),
            Self::Pending => write!(f, "pending"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}
