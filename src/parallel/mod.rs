//! Bounded worker pool for running one operation over a batch of items
//!
//! [`BatchRunner`] spawns at most `concurrency` worker tasks. Each task pulls
//! items from a shared [`WorkQueue`] until it is empty, hands every item to the
//! injected [`BatchWorker`] exactly once, and reports the outcome to a
//! [`BatchObserver`]. A failing or panicking item never stops its siblings.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::error::{ImgBatchError, Result};

pub mod failure_log;
pub mod progress;
pub mod scheduler;

pub use failure_log::FailureLog;
pub use progress::{BatchProgress, ProgressState};
pub use scheduler::WorkQueue;

/// Outcome of processing one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkResult {
    Success,
    Failure { reason: String },
}

impl WorkResult {
    /// Create a failure with the given diagnostic
    pub fn failure<S: Into<String>>(reason: S) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl<T> From<Result<T>> for WorkResult {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// A value that can be queued for a batch run.
///
/// `label` is how the item appears in logs and in the error log file.
pub trait BatchItem: Send + Sync + 'static {
    fn label(&self) -> String;
}

impl BatchItem for String {
    fn label(&self) -> String {
        self.clone()
    }
}

impl BatchItem for PathBuf {
    fn label(&self) -> String {
        self.display().to_string()
    }
}

impl BatchItem for usize {
    fn label(&self) -> String {
        self.to_string()
    }
}

/// The per-item operation run by the pool
#[async_trait]
pub trait BatchWorker<I: BatchItem>: Send + Sync {
    /// Process one item. Called exactly once per item.
    async fn process(&self, item: &I) -> WorkResult;

    /// Present participle describing the operation ("converting", "downloading")
    fn action(&self) -> &'static str {
        "processing"
    }
}

/// Receives progress and failure callbacks from a running batch.
///
/// Calls are serialized by the runner: no two callbacks ever run at the same
/// time, and `completed` is non-decreasing across `on_progress` calls.
pub trait BatchObserver<I>: Send + Sync {
    fn on_progress(&self, _completed: usize, _total: usize) {}

    fn on_failure(&self, _item: &I, _reason: &str) {}
}

/// Observer that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl<I> BatchObserver<I> for NoopObserver {}

/// Final tally of a batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
}

fn serialize_seconds<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl BatchSummary {
    /// Summary of a batch with no items
    pub fn empty() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Items that produced a result, successful or not
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Runs a [`BatchWorker`] over a list of items with bounded concurrency
#[derive(Debug, Clone)]
pub struct BatchRunner {
    concurrency: usize,
}

impl BatchRunner {
    /// Create a runner allowing at most `concurrency` simultaneous invocations
    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency < 1 {
            return Err(ImgBatchError::invalid_configuration(format!(
                "concurrency must be at least 1, got {}",
                concurrency
            )));
        }

        Ok(Self { concurrency })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process every item and wait until all of them have finished.
    ///
    /// Returns once every item has a result and every observer callback for
    /// it has returned. Items complete in no particular order.
    pub async fn run<I, W, O>(
        &self,
        items: Vec<I>,
        worker: Arc<W>,
        observer: Arc<O>,
    ) -> Result<BatchSummary>
    where
        I: BatchItem,
        W: BatchWorker<I> + 'static,
        O: BatchObserver<I> + 'static,
    {
        let start_time = Instant::now();
        let total = items.len();

        if total == 0 {
            debug!("Empty batch, nothing to do");
            return Ok(BatchSummary::empty());
        }

        let pool_size = self.concurrency.min(total);
        info!(
            "Starting batch of {} items ({}) with {} workers",
            total,
            worker.action(),
            pool_size
        );

        let queue = Arc::new(WorkQueue::new(items));
        let progress = Arc::new(Mutex::new(BatchProgress::new(total)));

        let tasks: Vec<_> = (0..pool_size)
            .map(|worker_id| {
                tokio::spawn(drain_queue(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&worker),
                    Arc::clone(&observer),
                    Arc::clone(&progress),
                ))
            })
            .collect();

        for task_result in futures::future::join_all(tasks).await {
            task_result.map_err(|e| ImgBatchError::parallel(format!("Task join error: {}", e)))?;
        }

        let state = progress.lock().unwrap_or_else(PoisonError::into_inner).snapshot();
        let summary = BatchSummary {
            total,
            succeeded: state.succeeded,
            failed: state.failed,
            elapsed: start_time.elapsed(),
        };

        info!(
            "Batch completed: {} succeeded, {} failed in {:.2}s ({})",
            summary.succeeded,
            summary.failed,
            summary.elapsed.as_secs_f64(),
            state.speed_text()
        );

        Ok(summary)
    }
}

/// Worker loop: take items until the queue is empty
async fn drain_queue<I, W, O>(
    worker_id: usize,
    queue: Arc<WorkQueue<I>>,
    worker: Arc<W>,
    observer: Arc<O>,
    progress: Arc<Mutex<BatchProgress>>,
) where
    I: BatchItem,
    W: BatchWorker<I> + ?Sized,
    O: BatchObserver<I> + ?Sized,
{
    while let Some((index, item)) = queue.pop() {
        debug!(worker_id, index, item = %item.label(), "Processing item");

        let result = match AssertUnwindSafe(worker.process(&item)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                WorkResult::failure(format!("internal error: {}", panic_message(panic.as_ref())))
            }
        };

        // Counter update and callbacks form one critical section
        {
            let mut progress = progress.lock().unwrap_or_else(PoisonError::into_inner);
            let completed = progress.record(result.is_success());
            observer.on_progress(completed, progress.total());

            if let WorkResult::Failure { reason } = &result {
                debug!(
                    worker_id,
                    index,
                    "Error {} {}: {}",
                    worker.action(),
                    item.label(),
                    reason
                );
                observer.on_failure(&item, reason);
            }
        }
    }

    debug!(worker_id, "Worker finished, queue drained");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
