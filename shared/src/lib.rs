//! Shared types for the image indexer
//!
//! Common types used across the workspace crates: the persisted processing
//! status, the tag names the indexer owns, failure classification and the
//! progress events a front-end consumes.

pub mod error;
pub mod models;
pub mod progress;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::FailureKind;
pub use models::{FileStatus, ImageTags, tag_names};
pub use progress::{
    FileOutcome, FileProblem, FileReport, GeneratedMetadata, ProgressEvent, RunSummary, SkipReason,
};
