//! Read-only status survey
//!
//! Resolves every discovered file without touching it, for the `status`
//! command.

use crate::resolver::resolve;
use futures::{StreamExt, stream};
use meta_gateway::MetadataStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct FileState {
    pub path: PathBuf,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub total: usize,
    pub counts: BTreeMap<&'static str, usize>,
    pub files: Vec<FileState>,
}

impl StatusReport {
    pub fn count(&self, state: &str) -> usize {
        self.counts.get(state).copied().unwrap_or(0)
    }
}

/// Resolve `files` with up to `concurrency` reads in flight, in input order
pub async fn survey(
    files: Vec<PathBuf>,
    store: Arc<dyn MetadataStore>,
    concurrency: usize,
) -> StatusReport {
    let states: Vec<FileState> = stream::iter(files)
        .map(|path| {
            let store = store.clone();
            async move {
                let snapshot = store.read(&path).await;
                let resolution = resolve(&snapshot, None);
                let detail = snapshot.err().map(|e| e.to_string());
                FileState {
                    state: resolution.name(),
                    path,
                    detail,
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = StatusReport {
        total: states.len(),
        ..Default::default()
    };
    for state in &states {
        *report.counts.entry(state.state).or_default() += 1;
    }
    report.files = states;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use meta_gateway::memory::MemoryStore;
    use shared::{FileStatus, ImageTags};

    #[tokio::test]
    async fn test_survey_counts_states() {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            "done.jpg",
            ImageTags {
                identifier: Some("px1:aa".into()),
                status: Some(FileStatus::Done),
                ..Default::default()
            },
        );
        store.insert("new.jpg", ImageTags::default());
        store.insert("bad.jpg", ImageTags::default());
        store.corrupt("bad.jpg");

        let files = vec!["done.jpg".into(), "new.jpg".into(), "bad.jpg".into()];
        let report = survey(files, store, 2).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.count("done"), 1);
        assert_eq!(report.count("unprocessed"), 1);
        assert_eq!(report.count("corrupted"), 1);
        assert_eq!(report.files[0].path, PathBuf::from("done.jpg"));
        assert!(report.files[2].detail.is_some());
    }
}
