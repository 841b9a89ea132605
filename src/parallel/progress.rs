//! Progress tracking for batch runs

use std::time::{Duration, Instant};

/// Mutable batch counters shared by every worker of a run.
///
/// The runner keeps this behind a mutex; `record` is the only mutation and is
/// called exactly once per finished item, so `completed` never exceeds `total`.
#[derive(Debug)]
pub struct BatchProgress {
    total: usize,
    completed: usize,
    succeeded: usize,
    failed: usize,
    start_time: Instant,
}

impl BatchProgress {
    /// Start tracking a batch of `total` items
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            succeeded: 0,
            failed: 0,
            start_time: Instant::now(),
        }
    }

    /// Count one finished item and return the updated `completed` value
    pub fn record(&mut self, success: bool) -> usize {
        debug_assert!(self.completed < self.total, "more completions than items");

        self.completed += 1;
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Take a point-in-time copy with the current throughput
    pub fn snapshot(&self) -> ProgressState {
        let elapsed_time = self.start_time.elapsed();
        let items_per_second = if elapsed_time.is_zero() {
            0.0
        } else {
            self.completed as f64 / elapsed_time.as_secs_f64()
        };

        ProgressState {
            total: self.total,
            completed: self.completed,
            succeeded: self.succeeded,
            failed: self.failed,
            elapsed_time,
            items_per_second,
        }
    }
}

/// Point-in-time view of a batch's progress
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_time: Duration,
    pub items_per_second: f64,
}

impl ProgressState {
    /// "X of Y" completion status
    pub fn status_text(&self) -> String {
        format!("{} of {}", self.completed, self.total)
    }

    /// Get processing speed as human-readable string
    pub fn speed_text(&self) -> String {
        if self.items_per_second >= 1.0 {
            format!("{:.1} items/sec", self.items_per_second)
        } else if self.items_per_second > 0.0 {
            format!("{:.1} sec/item", 1.0 / self.items_per_second)
        } else {
            "Unknown".to_string()
        }
    }
}
