//! Tracked metadata tags

use super::FileStatus;
use serde::{Deserialize, Serialize};

/// Tag names as understood by the metadata tool
pub mod tag_names {
    /// Ordered keyword list (resolved by MWG to IPTC/XMP subject fields)
    pub const KEYWORDS: &str = "MWG:Keywords";
    /// Caption (resolved by MWG to EXIF/IPTC/XMP description fields)
    pub const DESCRIPTION: &str = "MWG:Description";
    /// Processing fingerprint
    pub const IDENTIFIER: &str = "XMP:Identifier";
    /// Processing state
    pub const STATUS: &str = "XMP:Status";

    pub const ALL: [&str; 4] = [KEYWORDS, DESCRIPTION, IDENTIFIER, STATUS];
}

/// Snapshot of the four tracked tags on one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTags {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub status: Option<FileStatus>,
}

impl ImageTags {
    /// True when none of the tracked tags is present
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.description.as_deref().is_none_or(str::is_empty)
            && self.identifier.is_none()
            && self.status.is_none()
    }

    /// Description with surrounding whitespace removed, `None` when blank
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let tags = ImageTags::default();
        assert!(tags.is_empty());

        let tags = ImageTags {
            description: Some(String::new()),
            ..Default::default()
        };
        assert!(tags.is_empty());
        assert_eq!(tags.description_text(), None);
    }

    #[test]
    fn test_status_tag_makes_snapshot_non_empty() {
        let tags = ImageTags {
            status: Some(FileStatus::Failed),
            description: Some("  A cat.  ".into()),
            ..Default::default()
        };
        assert!(!tags.is_empty());
        assert_eq!(tags.status, Some(FileStatus::Failed));
        assert_eq!(tags.description_text(), Some("A cat."));
    }
}
