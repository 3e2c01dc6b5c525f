//! Indexing pipeline
//!
//! [`Pipeline::run`] discovers the images under a root and drives each one
//! through the per-file state machine in [`file`]. Files run on a bounded
//! worker pool; model calls are bounded separately by the captioner's
//! admission semaphore.
//!
//! A file's failure never stops the run. Each worker is wrapped so that
//! even a panic becomes a failed [`FileReport`] for that file alone.

mod file;
pub mod status;

use crate::core::{Backoff, IndexError, IndexResult, IndexerConfig, KeywordPolicy, RunContext};
use crate::discovery::discover;
use crate::inference::{Captioner, Sleeper, TokioSleeper};
use crate::keywords::KeywordRules;
use crate::resolver::ResolvePolicy;
use file::FileRun;
use futures::FutureExt;
use meta_gateway::MetadataStore;
use shared::{FailureKind, FileOutcome, FileReport, ProgressEvent, RunSummary};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use vision_client::VisionBackend;

pub use status::{FileState, StatusReport, survey};

/// Everything a file run reads; built once per run
pub(crate) struct Shared {
    pub(crate) config: IndexerConfig,
    pub(crate) rules: KeywordRules,
    pub(crate) policy: ResolvePolicy,
    pub(crate) backoff: Backoff,
    pub(crate) store: Arc<dyn MetadataStore>,
    pub(crate) captioner: Captioner,
    pub(crate) sleeper: Arc<dyn Sleeper>,
}

pub struct Pipeline {
    config: IndexerConfig,
    store: Arc<dyn MetadataStore>,
    backend: Arc<dyn VisionBackend>,
    sleeper: Arc<dyn Sleeper>,
}

impl Pipeline {
    pub fn new(
        config: IndexerConfig,
        store: Arc<dyn MetadataStore>,
        backend: Arc<dyn VisionBackend>,
    ) -> IndexResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            backend,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the delay used between retries (per call and per file)
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Discover and process every image under `root`
    pub async fn run(&self, root: &Path, ctx: Arc<RunContext>) -> IndexResult<RunSummary> {
        ctx.emit(ProgressEvent::RunStarted {
            root: root.to_path_buf(),
        });

        let files = {
            let root = root.to_path_buf();
            let discovery = self.config.discovery.clone();
            tokio::task::spawn_blocking(move || discover(&root, &discovery))
                .await
                .map_err(|e| IndexError::Internal(format!("discovery task: {}", e)))??
        };
        ctx.set_discovered(files.len());

        Ok(self.process(files, ctx).await)
    }

    /// Process an explicit file list
    pub async fn process(&self, files: Vec<PathBuf>, ctx: Arc<RunContext>) -> RunSummary {
        let shared = Arc::new(self.shared());
        let workers = Arc::new(Semaphore::new(self.config.concurrency.workers.max(1)));
        let total = files.len();

        info!(
            files = total,
            workers = self.config.concurrency.workers,
            inference = self.config.concurrency.inference,
            protocol = ?shared.captioner.protocol(),
            dry_run = self.config.dry_run,
            "Indexing started"
        );

        let mut tasks = JoinSet::new();
        let mut abandoned = 0;

        for (index, path) in files.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = ctx.cancel_token().cancelled() => None,
                permit = workers.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                abandoned = total - index;
                break;
            };

            let run = FileRun::new(path.clone(), shared.clone());
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let report = match AssertUnwindSafe(run.run(&ctx)).catch_unwind().await {
                    Ok(report) => report,
                    Err(panic) => panicked(path, panic),
                };
                ctx.record(report);
                drop(permit);
            });
        }

        if abandoned > 0 {
            info!(abandoned, "Cancelled; unstarted files are left for the next run");
        }
        ctx.record_abandoned(abandoned);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "File task did not complete");
            }
        }

        let summary = ctx.snapshot();
        info!(
            discovered = summary.discovered,
            committed = summary.committed,
            previewed = summary.previewed,
            skipped = summary.skipped,
            corrupted = summary.corrupted,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Indexing finished"
        );
        ctx.emit(ProgressEvent::RunFinished {
            summary: summary.clone(),
        });
        summary
    }

    fn shared(&self) -> Shared {
        let mut rules = self.config.keywords.clone();
        if self.config.keyword_policy == KeywordPolicy::Prepend {
            rules.new_first = true;
        }

        Shared {
            rules,
            policy: ResolvePolicy {
                reprocess: self.config.reprocess,
                mark_orphans: self.config.mark_orphans,
                verify_fingerprint: self.config.verify_fingerprint,
            },
            backoff: self.config.retry.backoff(),
            store: self.store.clone(),
            captioner: Captioner::new(self.backend.clone(), &self.config)
                .with_sleeper(self.sleeper.clone()),
            sleeper: self.sleeper.clone(),
            config: self.config.clone(),
        }
    }
}

fn panicked(path: PathBuf, panic: Box<dyn std::any::Any + Send>) -> FileReport {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    error!(path = %path.display(), panic = %message, "File pipeline panicked");

    FileReport {
        path,
        outcome: FileOutcome::Failed {
            kind: FailureKind::Internal,
        },
        attempts: 0,
        error: Some(format!("panic: {}", message)),
        generated: None,
    }
}
