//! In-memory metadata store with failure injection

use crate::error::{MetadataError, MetadataResult};
use crate::store::{MetadataStore, TagUpdate};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::ImageTags;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// Injected write failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Tool reports failure, nothing changes
    Reject,
    /// Tool reports success but only keywords and description land
    Partial,
}

#[derive(Debug, Default)]
struct Entry {
    tags: ImageTags,
    corrupted: bool,
    writes: usize,
    faults: VecDeque<Fault>,
}

/// Map-backed [`MetadataStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<PathBuf, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file with the given tags
    pub fn insert(&self, path: impl AsRef<Path>, tags: ImageTags) {
        self.files.lock().insert(
            path.as_ref().to_path_buf(),
            Entry {
                tags,
                ..Entry::default()
            },
        );
    }

    /// Make every read of `path` report corruption
    pub fn corrupt(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock();
        files
            .entry(path.as_ref().to_path_buf())
            .or_default()
            .corrupted = true;
    }

    /// Queue `count` failing writes for `path`
    pub fn fail_next_writes(&self, path: impl AsRef<Path>, count: usize, fault: Fault) {
        let mut files = self.files.lock();
        let entry = files.entry(path.as_ref().to_path_buf()).or_default();
        entry.faults.extend(std::iter::repeat_n(fault, count));
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<ImageTags> {
        self.files.lock().get(path.as_ref()).map(|e| e.tags.clone())
    }

    /// Write calls received for `path`, failed ones included
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        self.files
            .lock()
            .get(path.as_ref())
            .map(|e| e.writes)
            .unwrap_or(0)
    }

    pub fn total_writes(&self) -> usize {
        self.files.lock().values().map(|e| e.writes).sum()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn read(&self, path: &Path) -> MetadataResult<ImageTags> {
        let files = self.files.lock();
        match files.get(path) {
            Some(entry) if entry.corrupted => Err(MetadataError::Corrupted {
                path: path.to_path_buf(),
                reason: "injected corruption".into(),
            }),
            Some(entry) => Ok(entry.tags.clone()),
            None => Err(MetadataError::Read {
                path: path.to_path_buf(),
                reason: "file does not exist".into(),
            }),
        }
    }

    async fn write(&self, path: &Path, update: &TagUpdate) -> MetadataResult<()> {
        let mut files = self.files.lock();
        let Some(entry) = files.get_mut(path) else {
            return Err(MetadataError::Write {
                path: path.to_path_buf(),
                reason: "file does not exist".into(),
            });
        };
        entry.writes += 1;

        match entry.faults.pop_front() {
            Some(Fault::Reject) => Err(MetadataError::Write {
                path: path.to_path_buf(),
                reason: "injected write rejection".into(),
            }),
            Some(Fault::Partial) => {
                let partial = TagUpdate {
                    keywords: update.keywords.clone(),
                    description: update.description.clone(),
                    ..TagUpdate::default()
                };
                partial.apply_to(&mut entry.tags);
                Ok(())
            }
            None => {
                update.apply_to(&mut entry.tags);
                Ok(())
            }
        }
    }
}
