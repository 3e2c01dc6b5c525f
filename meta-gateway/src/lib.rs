//! # meta-gateway
//!
//! Reads and writes the four tags the indexer tracks on each image file.
//!
//! ## Scope
//!
//! This crate handles HOW tags reach the file:
//! - the [`MetadataStore`] capability (`read`, `write`)
//! - the ExifTool process adapter
//! - transactional commit: write, read back, retry once, never leave `Done`
//!   behind an unconfirmed write
//!
//! WHAT gets written (keywords, captions, status decisions) stays in the
//! indexer.
//!
//! ## Example
//!
//! ```ignore
//! use meta_gateway::{ExifTool, TagUpdate, commit};
//!
//! let exiftool = ExifTool::new("exiftool");
//! let update = TagUpdate::commit(keywords, Some(caption), identifier);
//! commit(&exiftool, path, &update).await?;
//! ```

mod commit;
mod error;
mod exiftool;
mod store;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

// Re-exports
pub use commit::{commit, mark_status};
pub use error::{MetadataError, MetadataResult};
pub use exiftool::{ExifTool, ExifToolOptions};
pub use store::{MetadataStore, TagUpdate};
