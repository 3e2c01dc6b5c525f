//! Failure category classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a terminal per-file failure
///
/// Categories follow the stage that gave up:
/// - `Inference`: endpoint unreachable, timed out or returned a non-success status
/// - `Unparsable`: the model answered but nothing structured could be salvaged
/// - `MetadataWrite`: the metadata tool refused or could not confirm the commit
/// - `Corrupted`: the file's metadata could not be read at all
/// - `Image`: no decodable image data could be prepared for the model
/// - `Internal`: anything else (I/O outside the gateway, worker panics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Inference,
    Unparsable,
    MetadataWrite,
    Corrupted,
    Image,
    Internal,
}

impl FailureKind {
    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inference => "inference",
            Self::Unparsable => "unparsable",
            Self::MetadataWrite => "metadata_write",
            Self::Corrupted => "corrupted",
            Self::Image => "image",
            Self::Internal => "internal",
        }
    }

    /// Whether another attempt in the same run may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Inference | Self::Unparsable | Self::MetadataWrite
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(FailureKind::Inference.is_retryable());
        assert!(FailureKind::Unparsable.is_retryable());
        assert!(FailureKind::MetadataWrite.is_retryable());
        assert!(!FailureKind::Corrupted.is_retryable());
        assert!(!FailureKind::Image.is_retryable());
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&FailureKind::MetadataWrite).unwrap();
        assert_eq!(json, "\"metadata_write\"");
        assert_eq!(FailureKind::MetadataWrite.to_string(), "metadata_write");
    }
}
