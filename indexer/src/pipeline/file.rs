//! Per-file state machine
//!
//! ```text
//! Discovered → Resolving → {Skipped | Corrupted | Ready}
//! Ready → Inferring → {Retrying | Parsed}
//! Parsed → Correcting → Committing → {Committed | Retrying}
//! Retrying → {Inferring | Committing | Failed}
//! ```
//!
//! Cancellation is checked before every stage; a stage that has started
//! runs to completion.

use super::Shared;
use crate::core::{IndexError, KeywordPolicy, RunContext};
use crate::imaging::{self, PreparedImage};
use crate::inference::{Generation, caption, sleep_or_cancel};
use crate::keywords;
use crate::resolver::{Action, Resolution, resolve};
use meta_gateway::{TagUpdate, commit, mark_status};
use shared::{
    FailureKind, FileOutcome, FileReport, FileStatus, GeneratedMetadata, ImageTags, SkipReason,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a retry re-enters the machine
enum Resume {
    Inferring,
    Committing(TagUpdate),
}

enum State {
    Discovered,
    Resolving,
    Ready(Box<Work>),
    Inferring(Box<Work>),
    Parsed(Box<Work>, Generation),
    Committing(Box<Work>, TagUpdate),
    Retrying {
        work: Box<Work>,
        resume: Resume,
        error: IndexError,
    },
    Finished(FileOutcome),
}

impl State {
    /// States that begin a new stage
    fn starts_stage(&self) -> bool {
        matches!(
            self,
            Self::Resolving | Self::Inferring(_) | Self::Committing(..)
        )
    }
}

/// What a processable file carries between stages
struct Work {
    tags: ImageTags,
    image: PreparedImage,
}

/// One file's run through the pipeline
pub(crate) struct FileRun {
    path: PathBuf,
    shared: Arc<Shared>,
    infer_attempts: u32,
    write_attempts: u32,
    error: Option<String>,
    generated: Option<GeneratedMetadata>,
}

impl FileRun {
    pub(crate) fn new(path: PathBuf, shared: Arc<Shared>) -> Self {
        Self {
            path,
            shared,
            infer_attempts: 0,
            write_attempts: 0,
            error: None,
            generated: None,
        }
    }

    pub(crate) async fn run(mut self, ctx: &RunContext) -> FileReport {
        let mut state = State::Discovered;

        let outcome = loop {
            if state.starts_stage() && ctx.is_cancelled() {
                debug!(path = %self.path.display(), "Cancelled before next stage");
                break FileOutcome::Cancelled;
            }

            state = match state {
                State::Finished(outcome) => break outcome,
                State::Discovered => State::Resolving,
                State::Resolving => self.resolve().await,
                State::Ready(work) => State::Inferring(work),
                State::Inferring(work) => self.infer(work, ctx).await,
                State::Parsed(work, generation) => self.correct(work, generation),
                State::Committing(work, update) => self.commit(work, update).await,
                State::Retrying {
                    work,
                    resume,
                    error,
                } => self.retry(work, resume, error, ctx).await,
            };
        };

        match &outcome {
            FileOutcome::Committed => {
                info!(path = %self.path.display(), attempts = self.infer_attempts, "Committed")
            }
            FileOutcome::Failed { kind } => warn!(
                path = %self.path.display(),
                kind = %kind,
                error = self.error.as_deref().unwrap_or_default(),
                "File failed"
            ),
            FileOutcome::Corrupted => warn!(
                path = %self.path.display(),
                error = self.error.as_deref().unwrap_or_default(),
                "Corrupted metadata, skipping"
            ),
            other => debug!(path = %self.path.display(), outcome = ?other, "File finished"),
        }

        FileReport {
            path: self.path,
            outcome,
            attempts: self.infer_attempts,
            error: self.error,
            generated: self.generated,
        }
    }

    async fn resolve(&mut self) -> State {
        let snapshot = self.shared.store.read(&self.path).await;
        let policy = self.shared.policy;
        let tags = snapshot.as_ref().ok().cloned().unwrap_or_default();

        let mut resolution = resolve(&snapshot, None);
        if resolution.wants_fingerprint(&tags, &policy) {
            match self.fingerprint().await {
                Ok(fresh) => resolution = resolve(&snapshot, Some(&fresh)),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Could not verify fingerprint")
                }
            }
        }
        debug!(path = %self.path.display(), resolution = resolution.name(), "Resolved");

        match resolution.action(&policy) {
            Action::Skip(reason) => State::Finished(FileOutcome::Skipped { reason }),
            Action::ReportCorrupted | Action::ReportUnreadable => {
                let outcome = match &resolution {
                    Resolution::Corrupted { .. } => FileOutcome::Corrupted,
                    _ => FileOutcome::Failed {
                        kind: FailureKind::Internal,
                    },
                };
                if let Resolution::Corrupted { reason } | Resolution::Unreadable { reason } =
                    resolution
                {
                    self.error = Some(reason);
                }
                State::Finished(outcome)
            }
            Action::MarkDone => self.mark_orphan(tags).await,
            Action::Process => {
                if let Resolution::Stale { stored, fresh } = &resolution {
                    info!(path = %self.path.display(), %stored, %fresh, "Image changed since last run");
                }
                match self.prepare().await {
                    Ok(image) => State::Ready(Box::new(Work { tags, image })),
                    Err(e) => {
                        if let IndexError::Image { identifier, .. } = &e {
                            self.persist(FileStatus::Failed, identifier.clone()).await;
                        }
                        self.fail(e)
                    }
                }
            }
        }
    }

    async fn mark_orphan(&mut self, tags: ImageTags) -> State {
        if self.shared.config.dry_run {
            return State::Finished(FileOutcome::Skipped {
                reason: SkipReason::Orphan,
            });
        }
        let store = self.shared.store.as_ref();
        match mark_status(store, &self.path, FileStatus::Done, tags.identifier).await {
            Ok(()) => {
                info!(path = %self.path.display(), "Marked orphan as done");
                State::Finished(FileOutcome::Skipped {
                    reason: SkipReason::Orphan,
                })
            }
            Err(e) => self.fail(e.into()),
        }
    }

    async fn infer(&mut self, work: Box<Work>, ctx: &RunContext) -> State {
        self.infer_attempts += 1;
        let want_caption =
            caption::wanted(work.tags.description.as_deref(), self.shared.config.caption_policy);

        let result = self
            .shared
            .captioner
            .generate(&work.image.payload, want_caption, ctx.cancel_token())
            .await;

        match result {
            Ok(generation) => State::Parsed(work, generation),
            Err(IndexError::Cancelled) => State::Finished(FileOutcome::Cancelled),
            Err(e) => {
                let attempts = self.infer_attempts;
                self.retry_or_fail(work, Resume::Inferring, e, attempts).await
            }
        }
    }

    /// Correcting: keyword engine and caption policy, then the commit decision
    fn correct(&mut self, work: Box<Work>, generation: Generation) -> State {
        let config = &self.shared.config;
        let existing: &[String] = match config.keyword_policy {
            KeywordPolicy::Replace => &[],
            KeywordPolicy::Append | KeywordPolicy::Prepend => &work.tags.keywords,
        };
        let keywords = keywords::correct(&generation.keywords, existing, &self.shared.rules);
        let description = caption::compose(
            work.tags.description.as_deref(),
            generation.caption.as_deref(),
            config.caption_policy,
        );

        debug!(
            path = %self.path.display(),
            raw = generation.keywords.len(),
            kept = keywords.len(),
            stage = ?generation.stage,
            "Keywords corrected"
        );

        self.generated = Some(GeneratedMetadata {
            keywords: keywords.clone(),
            description: description.clone(),
        });

        if config.dry_run {
            return State::Finished(FileOutcome::Previewed);
        }

        let update = TagUpdate::commit(keywords, description, work.image.identifier.clone());
        State::Committing(work, update)
    }

    async fn commit(&mut self, work: Box<Work>, update: TagUpdate) -> State {
        self.write_attempts += 1;
        match commit(self.shared.store.as_ref(), &self.path, &update).await {
            Ok(()) => State::Finished(FileOutcome::Committed),
            Err(e) => {
                let attempts = self.write_attempts;
                self.retry_or_fail(work, Resume::Committing(update), e.into(), attempts)
                    .await
            }
        }
    }

    async fn retry_or_fail(
        &mut self,
        work: Box<Work>,
        resume: Resume,
        error: IndexError,
        attempts: u32,
    ) -> State {
        if error.is_retryable() && attempts < self.shared.config.retry.max_attempts {
            return State::Retrying {
                work,
                resume,
                error,
            };
        }

        // status left for the next run to act on
        let status = match error.kind() {
            FailureKind::Inference => Some(FileStatus::Pending),
            FailureKind::MetadataWrite => None,
            _ => Some(FileStatus::Failed),
        };
        // a forced reprocess of an unchanged image keeps its earlier result
        let settled = work.tags.status.is_some_and(|s| s.is_settled())
            && work.tags.identifier.as_deref() == Some(work.image.identifier.as_str());
        if settled {
            debug!(path = %self.path.display(), "Keeping settled status of unchanged image");
        } else if let Some(status) = status {
            self.persist(status, Some(work.image.identifier.clone())).await;
        }
        self.fail(error)
    }

    async fn retry(
        &mut self,
        work: Box<Work>,
        resume: Resume,
        error: IndexError,
        ctx: &RunContext,
    ) -> State {
        let attempt = match resume {
            Resume::Inferring => self.infer_attempts,
            Resume::Committing(_) => self.write_attempts,
        };
        let delay = self.shared.backoff.delay(attempt);
        warn!(
            path = %self.path.display(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Attempt failed, retrying"
        );
        self.error = Some(error.to_string());

        if !sleep_or_cancel(self.shared.sleeper.as_ref(), delay, ctx.cancel_token()).await {
            return State::Finished(FileOutcome::Cancelled);
        }
        match resume {
            Resume::Inferring => State::Inferring(work),
            Resume::Committing(update) => State::Committing(work, update),
        }
    }

    fn fail(&mut self, error: IndexError) -> State {
        let kind = error.kind();
        self.error = Some(error.to_string());
        let outcome = match kind {
            FailureKind::Corrupted => FileOutcome::Corrupted,
            kind => FileOutcome::Failed { kind },
        };
        State::Finished(outcome)
    }

    /// Best-effort status write for a file that gives up
    async fn persist(&self, status: FileStatus, identifier: Option<String>) {
        if self.shared.config.dry_run {
            return;
        }
        let store = self.shared.store.as_ref();
        if let Err(e) = mark_status(store, &self.path, status, identifier).await {
            warn!(path = %self.path.display(), %status, error = %e, "Could not record status");
        }
    }

    async fn prepare(&self) -> Result<PreparedImage, IndexError> {
        let path = self.path.clone();
        let max = self.shared.config.image.max_dimension;
        tokio::task::spawn_blocking(move || imaging::prepare(&path, max))
            .await
            .map_err(|e| IndexError::Internal(format!("image task: {}", e)))?
    }

    async fn fingerprint(&self) -> Result<String, IndexError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || imaging::fingerprint(&path))
            .await
            .map_err(|e| IndexError::Internal(format!("image task: {}", e)))?
    }
}
