//! Per-key collector and batching layer.
//!
//! `Collector<V>` maps a fixed set of [`Key`]s to reply slots; `BatchCollector<V>`
//! layers batch accumulation on top. Keyed specifically by [`Key`] rather than
//! a generic `K` type parameter — every instantiation in this crate uses the
//! same key type, so a generic parameter would only add friction to the error
//! type without ever varying in practice (see `DESIGN.md`).

use crate::error::CommError;
use crate::key::Key;
use crate::queue::BlockingQueue;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

enum QueueItem<V> {
    Ready(Key, V),
    Shutdown,
}

/// Outcome of dequeuing one item from a [`Collector`].
pub enum Collected<V> {
    Item(Key, V),
    Shutdown,
}

/// Outcome of [`BatchCollector::wait_batch`].
pub enum BatchOutcome<V> {
    Batch(Vec<(Key, V)>),
    Shutdown,
}

struct ReplySlot {
    ready: Mutex<bool>,
    cvar: Condvar,
}

impl ReplySlot {
    fn new() -> Self {
        Self {
            ready: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }
}

/// Maps an enumerated set of keys to one-shot reply slots, plus a shared
/// queue of in-flight `(key, value)` pairs.
pub struct Collector<V> {
    queue: BlockingQueue<QueueItem<V>>,
    reply_slots: HashMap<Key, ReplySlot>,
}

impl<V> Collector<V> {
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            queue: BlockingQueue::new(),
            reply_slots: keys.into_iter().map(|k| (k, ReplySlot::new())).collect(),
        }
    }

    /// Stores `value` and enqueues it for a consumer. Non-blocking.
    pub fn send_data(&self, key: Key, value: V) -> Result<(), CommError> {
        if !self.reply_slots.contains_key(&key) {
            return Err(CommError::KeyNotFound(key));
        }
        self.queue.enqueue(QueueItem::Ready(key, value));
        Ok(())
    }

    /// Enqueues the shutdown marker, unblocking any pending `wait_one`/`wait_batch`.
    ///
    /// This bypasses the per-key slot table entirely — there is no "key 0
    /// with a null value" trick here, just a distinct queue item variant.
    pub fn send_shutdown(&self) {
        self.queue.enqueue(QueueItem::Shutdown);
    }

    /// Marks `key`'s reply as ready and wakes its waiter.
    pub fn signal_reply(&self, key: Key) -> Result<(), CommError> {
        let slot = self.reply_slots.get(&key).ok_or(CommError::KeyNotFound(key))?;
        let mut ready = slot.ready.lock().unwrap();
        *ready = true;
        slot.cvar.notify_all();
        Ok(())
    }

    /// Blocks until `key`'s reply is ready, then clears the flag.
    pub fn wait_reply(&self, key: Key) -> Result<(), CommError> {
        let slot = self.reply_slots.get(&key).ok_or(CommError::KeyNotFound(key))?;
        let ready = slot.ready.lock().unwrap();
        let mut ready = slot.cvar.wait_while(ready, |r| !*r).unwrap();
        *ready = false;
        Ok(())
    }

    /// Atomic `send_data` then `wait_reply`.
    pub fn send_data_wait_reply(&self, key: Key, value: V) -> Result<(), CommError> {
        self.send_data(key, value)?;
        self.wait_reply(key)
    }

    /// Dequeues the next ready item, blocking if none is available.
    pub fn wait_one(&self) -> Collected<V> {
        match self.queue.wait_dequeue() {
            QueueItem::Ready(k, v) => Collected::Item(k, v),
            QueueItem::Shutdown => Collected::Shutdown,
        }
    }

    /// Timed variant of [`Collector::wait_one`].
    pub fn wait_one_timed(&self, timeout: Duration) -> Option<Collected<V>> {
        self.queue.wait_dequeue_timed(timeout).map(|item| match item {
            QueueItem::Ready(k, v) => Collected::Item(k, v),
            QueueItem::Shutdown => Collected::Shutdown,
        })
    }
}

/// Layers `wait_batch(n)` accumulation over a [`Collector`]. Non-reentrant:
/// only the owning collector-group thread calls `wait_batch`.
pub struct BatchCollector<V> {
    inner: Collector<V>,
}

impl<V> BatchCollector<V> {
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            inner: Collector::new(keys),
        }
    }

    pub fn send_data(&self, key: Key, value: V) -> Result<(), CommError> {
        self.inner.send_data(key, value)
    }

    pub fn send_shutdown(&self) {
        self.inner.send_shutdown();
    }

    pub fn wait_reply(&self, key: Key) -> Result<(), CommError> {
        self.inner.wait_reply(key)
    }

    pub fn signal_reply(&self, key: Key) -> Result<(), CommError> {
        self.inner.signal_reply(key)
    }

    /// Pops items until `n` have accumulated, or a shutdown marker is seen.
    ///
    /// Returns `BatchOutcome::Shutdown` the instant the marker is dequeued,
    /// discarding whatever had accumulated so far. This is safe because the
    /// only caller that matters, `CollectorGroup::run`, always forces
    /// `batch_size` to 1 before any shutdown marker can be sent (see
    /// `SPEC_FULL.md` Design Notes), so a partial accumulation larger than
    /// zero never coexists with a pending shutdown marker in practice.
    pub fn wait_batch(&self, n: usize) -> BatchOutcome<V> {
        let n = n.max(1);
        let mut acc = Vec::with_capacity(n);
        loop {
            match self.inner.wait_one() {
                Collected::Shutdown => return BatchOutcome::Shutdown,
                Collected::Item(k, v) => {
                    acc.push((k, v));
                    if acc.len() >= n {
                        return BatchOutcome::Batch(acc);
                    }
                }
            }
        }
    }
}
