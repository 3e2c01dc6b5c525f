//! Shared state of one indexing run
//!
//! Every worker gets the same [`RunContext`] by `Arc`. It carries the
//! cancellation token, aggregate counters and the optional progress
//! channel; nothing else is shared between file pipelines.

use parking_lot::Mutex;
use shared::{FileOutcome, FileProblem, FileReport, ProgressEvent, RunSummary};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Counters {
    discovered: AtomicUsize,
    committed: AtomicUsize,
    previewed: AtomicUsize,
    skipped: AtomicUsize,
    corrupted: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

/// Cancellation, counters and progress events for one run
#[derive(Debug)]
pub struct RunContext {
    cancel: CancellationToken,
    counters: Counters,
    problems: Mutex<Vec<FileProblem>>,
    /// Serializes record + snapshot so event totals never go backwards
    record_lock: Mutex<()>,
    events: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl RunContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            counters: Counters::default(),
            problems: Mutex::new(Vec::new()),
            record_lock: Mutex::new(()),
            events: None,
        }
    }

    /// Send progress events to `sender`
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Emit an event; a closed receiver is not an error
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    pub fn set_discovered(&self, total: usize) {
        self.counters.discovered.store(total, Ordering::SeqCst);
        self.emit(ProgressEvent::Discovered { total });
    }

    /// Count files abandoned before they started
    pub fn record_abandoned(&self, count: usize) {
        if count > 0 {
            self.counters.cancelled.fetch_add(count, Ordering::SeqCst);
        }
    }

    /// Count a finished file and emit its report with the new totals
    pub fn record(&self, report: FileReport) {
        let _guard = self.record_lock.lock();

        let counter = match report.outcome {
            FileOutcome::Committed => &self.counters.committed,
            FileOutcome::Previewed => &self.counters.previewed,
            FileOutcome::Skipped { .. } => &self.counters.skipped,
            FileOutcome::Corrupted => &self.counters.corrupted,
            FileOutcome::Failed { .. } => &self.counters.failed,
            FileOutcome::Cancelled => &self.counters.cancelled,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = report.outcome.failure_kind() {
            self.problems.lock().push(FileProblem {
                path: report.path.clone(),
                kind,
                message: report.error.clone().unwrap_or_else(|| kind.to_string()),
            });
        }

        let totals = self.snapshot();
        self.emit(ProgressEvent::FileFinished { report, totals });
    }

    /// Current aggregate counts
    pub fn snapshot(&self) -> RunSummary {
        let load = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        RunSummary {
            discovered: load(&self.counters.discovered),
            committed: load(&self.counters.committed),
            previewed: load(&self.counters.previewed),
            skipped: load(&self.counters.skipped),
            corrupted: load(&self.counters.corrupted),
            failed: load(&self.counters.failed),
            cancelled: load(&self.counters.cancelled),
            problems: self.problems.lock().clone(),
        }
    }
}
