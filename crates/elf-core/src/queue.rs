//! Multi-producer / multi-consumer blocking FIFO queue.
//!
//! The single suspension point between the daemon and the collector groups.
//! Fairness across producers is not required; progress under arbitrary
//! interleavings is.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub struct BlockingQueue<T> {
    items: Mutex<VecDeque<T>>,
    cvar: Condvar,
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockingQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            cvar: Condvar::new(),
        }
    }

    /// Never blocks, never fails.
    pub fn enqueue(&self, item: T) {
        let mut items = self.items.lock().unwrap();
        items.push_back(item);
        self.cvar.notify_one();
    }

    /// Blocks until an item is available, then returns it.
    pub fn wait_dequeue(&self) -> T {
        let guard = self.items.lock().unwrap();
        let mut guard = self
            .cvar
            .wait_while(guard, |items| items.is_empty())
            .unwrap();
        guard.pop_front().expect("woke with a non-empty queue")
    }

    /// Blocks at most `timeout`; returns `None` if nothing arrived in time.
    ///
    /// Uses `wait_timeout_while` so spurious wakeups never produce a
    /// premature `None` before the deadline actually elapses.
    pub fn wait_dequeue_timed(&self, timeout: Duration) -> Option<T> {
        let guard = self.items.lock().unwrap();
        let (mut guard, result) = self
            .cvar
            .wait_timeout_while(guard, timeout, |items| items.is_empty())
            .unwrap();
        if result.timed_out() {
            None
        } else {
            Some(guard.pop_front().expect("woke with a non-empty queue"))
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
