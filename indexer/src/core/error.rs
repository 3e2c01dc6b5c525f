use crate::repair::UnparsableResponseError;
use meta_gateway::MetadataError;
use shared::FailureKind;
use std::path::PathBuf;
use thiserror::Error;
use vision_client::InferenceError;

/// Indexer error types
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Unparsable(#[from] UnparsableResponseError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// No decodable image data; `identifier` is the byte-level fallback
    #[error("No usable image in {path}: {reason}")]
    Image {
        path: PathBuf,
        reason: String,
        identifier: Option<String>,
    },

    #[error("Cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Failure category reported for a file that ends with this error
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Inference(_) => FailureKind::Inference,
            Self::Unparsable(_) => FailureKind::Unparsable,
            Self::Metadata(e) if e.is_corrupted() => FailureKind::Corrupted,
            Self::Metadata(e) if e.is_write_failure() => FailureKind::MetadataWrite,
            Self::Image { .. } => FailureKind::Image,
            Self::Metadata(_)
            | Self::Config(_)
            | Self::Io { .. }
            | Self::Cancelled
            | Self::Internal(_) => FailureKind::Internal,
        }
    }

    /// Another attempt at the same stage may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Inference(e) => e.is_retryable(),
            Self::Unparsable(_) => true,
            Self::Metadata(e) => e.is_write_failure(),
            _ => false,
        }
    }
}

/// Result type for indexer operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let corrupted = IndexError::Metadata(MetadataError::Corrupted {
            path: "a.jpg".into(),
            reason: "bad".into(),
        });
        assert_eq!(corrupted.kind(), FailureKind::Corrupted);
        assert!(!corrupted.is_retryable());

        let write = IndexError::Metadata(MetadataError::Write {
            path: "a.jpg".into(),
            reason: "read-only".into(),
        });
        assert_eq!(write.kind(), FailureKind::MetadataWrite);
        assert!(write.is_retryable());

        let timeout = IndexError::Inference(InferenceError::Timeout("120s".into()));
        assert_eq!(timeout.kind(), FailureKind::Inference);
        assert!(timeout.is_retryable());

        let config = IndexError::Inference(InferenceError::InvalidConfig("no url".into()));
        assert!(!config.is_retryable());
    }
}
