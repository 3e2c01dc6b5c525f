//! Transactional commit on top of a [`MetadataStore`]
//!
//! A commit is confirmed only when a read-back shows every written field.
//! On failure the whole write is repeated once; if that also fails and the
//! update would have set `Done`, the file is marked `Failed` instead so no
//! unconfirmed `Done` survives.

use crate::error::{MetadataError, MetadataResult};
use crate::store::{MetadataStore, TagUpdate};
use shared::FileStatus;
use std::path::Path;
use tracing::{info, warn};

const WRITE_ATTEMPTS: u32 = 2;

/// Write `update` and confirm it by reading the file back
pub async fn commit<S>(store: &S, path: &Path, update: &TagUpdate) -> MetadataResult<()>
where
    S: MetadataStore + ?Sized,
{
    let mut last_error = None;

    for attempt in 1..=WRITE_ATTEMPTS {
        match write_verified(store, path, update).await {
            Ok(()) => {
                if attempt > 1 {
                    info!(path = %path.display(), attempt, "Commit confirmed after retry");
                }
                return Ok(());
            }
            Err(e) => {
                warn!(path = %path.display(), attempt, error = %e, "Commit attempt failed");
                last_error = Some(e);
            }
        }
    }

    if update.status == Some(FileStatus::Done) {
        let fallback = TagUpdate::status(FileStatus::Failed, update.identifier.clone());
        if let Err(e) = store.write(path, &fallback).await {
            warn!(path = %path.display(), error = %e, "Could not mark file as failed after commit failure");
        }
    }

    Err(last_error.unwrap_or_else(|| MetadataError::Write {
        path: path.to_path_buf(),
        reason: "commit failed".into(),
    }))
}

/// Set only the status (and optionally the identifier), confirmed by read-back
pub async fn mark_status<S>(
    store: &S,
    path: &Path,
    status: FileStatus,
    identifier: Option<String>,
) -> MetadataResult<()>
where
    S: MetadataStore + ?Sized,
{
    write_verified(store, path, &TagUpdate::status(status, identifier)).await
}

async fn write_verified<S>(store: &S, path: &Path, update: &TagUpdate) -> MetadataResult<()>
where
    S: MetadataStore + ?Sized,
{
    store.write(path, update).await?;
    let written = store.read(path).await?;
    match update.mismatch(&written) {
        None => Ok(()),
        Some(field) => Err(MetadataError::Unverified {
            path: path.to_path_buf(),
            reason: format!("{} not written as requested", field),
        }),
    }
}
