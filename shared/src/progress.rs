//! Progress events emitted by the indexing pipeline
//!
//! The pipeline never renders anything; it sends these events to whoever is
//! listening (the CLI logs them or prints them as JSON lines).

use crate::error::FailureKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why a file was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Status `Done` with a matching identifier
    AlreadyDone,
    /// Status `Failed` and failed files are not being reprocessed
    PreviouslyFailed,
    /// Status `Skipped` set by a user or an earlier run
    MarkedSkipped,
    /// Identifier and keywords but no status: status was added, nothing generated
    Orphan,
}

/// Terminal state of one file in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Keywords, description, identifier and status confirmed written
    Committed,
    /// Dry run: generated but deliberately not written
    Previewed,
    Skipped { reason: SkipReason },
    /// Metadata unreadable; never retried
    Corrupted,
    /// Gave up after the attempt limit
    Failed { kind: FailureKind },
    /// Cancellation arrived before the file could finish
    Cancelled,
}

impl FileOutcome {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind } => Some(*kind),
            Self::Corrupted => Some(FailureKind::Corrupted),
            _ => None,
        }
    }
}

/// What the model produced for a file after repair and correction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedMetadata {
    pub keywords: Vec<String>,
    pub description: Option<String>,
}

/// Per-file result, one per discovered file that was started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    /// Attempts spent in this run (0 when inference never started)
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedMetadata>,
}

/// Running aggregate counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub discovered: usize,
    pub committed: usize,
    pub previewed: usize,
    pub skipped: usize,
    pub corrupted: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Failed and corrupted files with their classification
    #[serde(default)]
    pub problems: Vec<FileProblem>,
}

/// A failed or corrupted file listed in the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProblem {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl RunSummary {
    /// Files that reached a terminal state this run
    pub fn finished(&self) -> usize {
        self.committed + self.previewed + self.skipped + self.corrupted + self.failed
    }

    pub fn has_problems(&self) -> bool {
        self.failed > 0 || self.corrupted > 0
    }
}

/// Event stream consumed by a front-end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunStarted { root: PathBuf },
    Discovered { total: usize },
    FileFinished {
        report: FileReport,
        totals: RunSummary,
    },
    RunFinished { summary: RunSummary },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        assert_eq!(FileOutcome::Committed.failure_kind(), None);
        assert_eq!(
            FileOutcome::Skipped {
                reason: SkipReason::AlreadyDone
            }
            .failure_kind(),
            None
        );
        assert_eq!(
            FileOutcome::Corrupted.failure_kind(),
            Some(FailureKind::Corrupted)
        );
        assert_eq!(FileOutcome::Cancelled.failure_kind(), None);
    }

    #[test]
    fn test_event_json_shape() {
        let event = ProgressEvent::Discovered { total: 3 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "discovered");
        assert_eq!(json["total"], 3);

        let outcome = FileOutcome::Failed {
            kind: FailureKind::Inference,
        };
        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["kind"], "inference");
    }
}
