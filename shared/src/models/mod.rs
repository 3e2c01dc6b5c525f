//! Data models
//!
//! The four tags the indexer reads and writes on every image, and the
//! persisted processing status carried by one of them.

mod status;
mod tags;

pub use status::FileStatus;
pub use tags::{ImageTags, tag_names};
