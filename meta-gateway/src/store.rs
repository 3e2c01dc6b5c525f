//! Metadata store capability

use crate::MetadataResult;
use async_trait::async_trait;
use shared::{FileStatus, ImageTags};
use std::path::Path;

/// Tags to write; `None` fields are left untouched on the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    /// Replaces the whole keyword list (an empty list clears it)
    pub keywords: Option<Vec<String>>,
    pub description: Option<String>,
    pub identifier: Option<String>,
    pub status: Option<FileStatus>,
}

impl TagUpdate {
    /// Full commit of a processed file
    pub fn commit(
        keywords: Vec<String>,
        description: Option<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            keywords: Some(keywords),
            description,
            identifier: Some(identifier.into()),
            status: Some(FileStatus::Done),
        }
    }

    /// Status change only, keeping (or setting) the identifier
    pub fn status(status: FileStatus, identifier: Option<String>) -> Self {
        Self {
            status: Some(status),
            identifier,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_none()
            && self.description.is_none()
            && self.identifier.is_none()
            && self.status.is_none()
    }

    /// Apply to an in-memory snapshot
    pub fn apply_to(&self, tags: &mut ImageTags) {
        if let Some(keywords) = &self.keywords {
            tags.keywords = keywords.clone();
        }
        if let Some(description) = &self.description {
            tags.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(identifier) = &self.identifier {
            tags.identifier = Some(identifier.clone());
        }
        if let Some(status) = self.status {
            tags.status = status.tag_value().map(|_| status);
        }
    }

    /// First field of this update not reflected in `tags`, if any
    ///
    /// Whitespace the tool may add around values is ignored; case and
    /// keyword order are not.
    pub fn mismatch(&self, tags: &ImageTags) -> Option<&'static str> {
        if let Some(keywords) = &self.keywords {
            let expected = keywords.iter().map(|k| k.trim());
            let actual = tags.keywords.iter().map(|k| k.trim());
            if !expected.eq(actual) {
                return Some("keywords");
            }
        }
        if let Some(description) = &self.description {
            let expected = Some(description.trim()).filter(|d| !d.is_empty());
            if expected != tags.description_text() {
                return Some("description");
            }
        }
        if let Some(identifier) = &self.identifier
            && tags.identifier.as_deref().map(str::trim) != Some(identifier.trim())
        {
            return Some("identifier");
        }
        if let Some(status) = self.status {
            let expected = status.tag_value().map(|_| status);
            if tags.status != expected {
                return Some("status");
            }
        }
        None
    }
}

/// Read/write access to the tracked tags of a file
///
/// Implementations must distinguish a file with no tags (an empty
/// [`ImageTags`]) from a file whose metadata cannot be read
/// ([`MetadataError::Corrupted`](crate::MetadataError::Corrupted)).
/// A single `write` call must land all of its fields together or none.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn read(&self, path: &Path) -> MetadataResult<ImageTags>;

    async fn write(&self, path: &Path, update: &TagUpdate) -> MetadataResult<()>;
}
