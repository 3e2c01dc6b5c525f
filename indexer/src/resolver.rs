//! Processing-state resolution
//!
//! [`resolve`] looks at a file's metadata snapshot (and, when available,
//! a freshly computed identifier) and says what state the file is in.
//! [`Resolution::action`] turns that into what this run does with it.

use crate::core::ReprocessMode;
use crate::imaging::is_pixel_identifier;
use meta_gateway::MetadataResult;
use shared::{FileStatus, ImageTags, SkipReason};

/// Observed processing state of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No identifier: never touched
    Unprocessed,
    /// Identifier but no completed commit (`Pending`, or no status and no keywords)
    Interrupted,
    /// `Done`, but the pixels no longer match the stored identifier
    Stale { stored: String, fresh: String },
    AlreadyDone,
    PreviouslyFailed,
    MarkedSkipped,
    /// Identifier and keywords but no status
    Orphan,
    /// Metadata unreadable
    Corrupted { reason: String },
    /// Metadata read failed for a reason unrelated to the file
    Unreadable { reason: String },
}

/// What the pipeline does with a resolved file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Process,
    Skip(SkipReason),
    /// Add `Done` without generating anything
    MarkDone,
    ReportCorrupted,
    ReportUnreadable,
}

/// Decision knobs that come from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvePolicy {
    pub reprocess: ReprocessMode,
    pub mark_orphans: bool,
    pub verify_fingerprint: bool,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            reprocess: ReprocessMode::Skip,
            mark_orphans: true,
            verify_fingerprint: false,
        }
    }
}

/// Resolve a snapshot; `fresh` is the identifier computed from the file now
pub fn resolve(snapshot: &MetadataResult<ImageTags>, fresh: Option<&str>) -> Resolution {
    let tags = match snapshot {
        Ok(tags) => tags,
        Err(e) if e.is_corrupted() => {
            return Resolution::Corrupted {
                reason: e.to_string(),
            };
        }
        Err(e) => {
            return Resolution::Unreadable {
                reason: e.to_string(),
            };
        }
    };

    let Some(stored) = tags
        .identifier
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    else {
        return Resolution::Unprocessed;
    };

    match tags.status {
        Some(FileStatus::Done) => match fresh {
            Some(fresh) if is_pixel_identifier(stored) && fresh != stored => Resolution::Stale {
                stored: stored.to_string(),
                fresh: fresh.to_string(),
            },
            _ => Resolution::AlreadyDone,
        },
        Some(FileStatus::Failed) => Resolution::PreviouslyFailed,
        Some(FileStatus::Skipped) => Resolution::MarkedSkipped,
        Some(FileStatus::Pending) => Resolution::Interrupted,
        Some(FileStatus::Unprocessed) | None if !tags.keywords.is_empty() => Resolution::Orphan,
        Some(FileStatus::Unprocessed) | None => Resolution::Interrupted,
    }
}

impl Resolution {
    pub fn action(&self, policy: &ResolvePolicy) -> Action {
        let all = policy.reprocess == ReprocessMode::All;
        match self {
            Self::Corrupted { .. } => Action::ReportCorrupted,
            Self::Unreadable { .. } => Action::ReportUnreadable,
            Self::Unprocessed | Self::Interrupted | Self::Stale { .. } => Action::Process,
            Self::AlreadyDone if all => Action::Process,
            Self::AlreadyDone => Action::Skip(SkipReason::AlreadyDone),
            Self::PreviouslyFailed if policy.reprocess != ReprocessMode::Skip => Action::Process,
            Self::PreviouslyFailed => Action::Skip(SkipReason::PreviouslyFailed),
            Self::MarkedSkipped if all => Action::Process,
            Self::MarkedSkipped => Action::Skip(SkipReason::MarkedSkipped),
            Self::Orphan if all || !policy.mark_orphans => Action::Process,
            Self::Orphan => Action::MarkDone,
        }
    }

    /// Whether a fresh identifier could change this resolution
    pub fn wants_fingerprint(&self, tags: &ImageTags, policy: &ResolvePolicy) -> bool {
        policy.verify_fingerprint
            && policy.reprocess != ReprocessMode::All
            && *self == Self::AlreadyDone
            && tags.identifier.as_deref().is_some_and(is_pixel_identifier)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unprocessed => "unprocessed",
            Self::Interrupted => "interrupted",
            Self::Stale { .. } => "stale",
            Self::AlreadyDone => "done",
            Self::PreviouslyFailed => "failed",
            Self::MarkedSkipped => "skipped",
            Self::Orphan => "orphan",
            Self::Corrupted { .. } => "corrupted",
            Self::Unreadable { .. } => "unreadable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meta_gateway::MetadataError;

    const PX: &str = "px1:aaaa";

    fn tags(identifier: Option<&str>, status: Option<FileStatus>, keywords: &[&str]) -> ImageTags {
        ImageTags {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            description: None,
            identifier: identifier.map(str::to_string),
            status,
        }
    }

    #[test]
    fn test_resolution_table() {
        let cases = [
            (tags(None, None, &[]), Resolution::Unprocessed),
            // status without identifier never counts as processed
            (tags(None, Some(FileStatus::Done), &["cat"]), Resolution::Unprocessed),
            (tags(Some(PX), Some(FileStatus::Done), &[]), Resolution::AlreadyDone),
            (tags(Some(PX), Some(FileStatus::Failed), &[]), Resolution::PreviouslyFailed),
            (tags(Some(PX), Some(FileStatus::Pending), &["cat"]), Resolution::Interrupted),
            (tags(Some(PX), Some(FileStatus::Skipped), &[]), Resolution::MarkedSkipped),
            (tags(Some(PX), None, &["cat"]), Resolution::Orphan),
            (tags(Some(PX), None, &[]), Resolution::Interrupted),
            (tags(Some("  "), Some(FileStatus::Done), &[]), Resolution::Unprocessed),
        ];
        for (snapshot, expected) in cases {
            assert_eq!(resolve(&Ok(snapshot.clone()), None), expected, "{snapshot:?}");
        }
    }

    #[test]
    fn test_read_errors() {
        let corrupted = Err(MetadataError::Corrupted {
            path: "a.jpg".into(),
            reason: "bad header".into(),
        });
        assert!(matches!(resolve(&corrupted, None), Resolution::Corrupted { .. }));

        let spawn = Err(MetadataError::Read {
            path: "a.jpg".into(),
            reason: "gone".into(),
        });
        assert!(matches!(resolve(&spawn, None), Resolution::Unreadable { .. }));
    }

    #[test]
    fn test_stale_detection() {
        let done = Ok(tags(Some(PX), Some(FileStatus::Done), &[]));
        assert_eq!(resolve(&done, Some(PX)), Resolution::AlreadyDone);
        assert_eq!(
            resolve(&done, Some("px1:bbbb")),
            Resolution::Stale {
                stored: PX.into(),
                fresh: "px1:bbbb".into()
            }
        );

        // identifiers from other tools are never compared
        let legacy = Ok(tags(Some("7f1c-uuid"), Some(FileStatus::Done), &[]));
        assert_eq!(resolve(&legacy, Some("px1:bbbb")), Resolution::AlreadyDone);
    }

    #[test]
    fn test_actions_by_mode() {
        let skip = ResolvePolicy::default();
        let failed = ResolvePolicy {
            reprocess: ReprocessMode::Failed,
            ..skip
        };
        let all = ResolvePolicy {
            reprocess: ReprocessMode::All,
            ..skip
        };

        assert_eq!(
            Resolution::AlreadyDone.action(&skip),
            Action::Skip(SkipReason::AlreadyDone)
        );
        assert_eq!(Resolution::AlreadyDone.action(&all), Action::Process);
        assert_eq!(
            Resolution::PreviouslyFailed.action(&skip),
            Action::Skip(SkipReason::PreviouslyFailed)
        );
        assert_eq!(Resolution::PreviouslyFailed.action(&failed), Action::Process);
        assert_eq!(Resolution::Orphan.action(&skip), Action::MarkDone);
        assert_eq!(
            Resolution::Orphan.action(&ResolvePolicy {
                mark_orphans: false,
                ..skip
            }),
            Action::Process
        );
        assert_eq!(
            Resolution::Corrupted {
                reason: String::new()
            }
            .action(&all),
            Action::ReportCorrupted
        );
    }

    #[test]
    fn test_wants_fingerprint() {
        let policy = ResolvePolicy {
            verify_fingerprint: true,
            ..ResolvePolicy::default()
        };
        let done = tags(Some(PX), Some(FileStatus::Done), &[]);
        assert!(Resolution::AlreadyDone.wants_fingerprint(&done, &policy));
        assert!(!Resolution::AlreadyDone.wants_fingerprint(&done, &ResolvePolicy::default()));

        let legacy = tags(Some("uuid"), Some(FileStatus::Done), &[]);
        assert!(!Resolution::AlreadyDone.wants_fingerprint(&legacy, &policy));
    }
}
