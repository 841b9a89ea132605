//! Append-only error log for failed items

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::error;

use super::{BatchItem, BatchObserver};
use crate::error::Result;

/// Plain-text log with one `Error <action> <item>: <reason>` line per failure.
///
/// The file is opened in append mode on the first failure, so a clean run
/// leaves no file behind. Every line is flushed as soon as it is written.
///
/// Writes are synchronous `std::fs` calls made inside the runner's callback
/// critical section, so a slow disk stalls every worker of the batch.
pub struct FailureLog {
    path: PathBuf,
    action: String,
    file: Mutex<Option<File>>,
    entries: AtomicUsize,
}

impl FailureLog {
    /// Create a log that will write to `path`, describing failures as `action`
    pub fn new<P: Into<PathBuf>, S: Into<String>>(path: P, action: S) -> Self {
        Self {
            path: path.into(),
            action: action.into(),
            file: Mutex::new(None),
            entries: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written by this log
    pub fn entries(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }

    /// Format a single log line (without the trailing newline)
    pub fn format_line(action: &str, item: &str, reason: &str) -> String {
        format!("Error {} {}: {}", action, item, reason)
    }

    /// Append one failure to the log
    pub fn record(&self, item: &str, reason: &str) -> Result<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);

        if file.is_none() {
            let opened = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            *file = Some(opened);
        }

        if let Some(file) = file.as_mut() {
            writeln!(file, "{}", Self::format_line(&self.action, item, reason))?;
            file.flush()?;
            self.entries.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}

impl<I: BatchItem> BatchObserver<I> for FailureLog {
    fn on_failure(&self, item: &I, reason: &str) {
        if let Err(e) = self.record(&item.label(), reason) {
            error!("Failed to write error log {:?}: {}", self.path, e);
        }
    }
}
