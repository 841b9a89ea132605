//! Shared work queue feeding the worker pool

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// FIFO queue of pending items, drained concurrently by the pool's workers.
///
/// Each entry carries the item's position in the original input so log lines
/// can refer back to it. An item leaves the queue exactly once.
pub struct WorkQueue<I> {
    pending: Mutex<VecDeque<(usize, I)>>,
}

impl<I> WorkQueue<I> {
    /// Create a queue holding `items` in input order
    pub fn new(items: Vec<I>) -> Self {
        Self {
            pending: Mutex::new(items.into_iter().enumerate().collect()),
        }
    }

    /// Take the next pending item, or `None` once the queue is drained
    pub fn pop(&self) -> Option<(usize, I)> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}
