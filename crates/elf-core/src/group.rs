//! One batching pipeline: accumulates a batch, hands it to the data-address
//! collaborator, signals the daemon, waits for consumption, then releases
//! each contributing game.

use crate::ai_comm::Info;
use crate::collector::{BatchCollector, BatchOutcome};
use crate::data_addr::DataAddr;
use crate::error::CommError;
use crate::game_state::GameState;
use crate::key::Key;
use crate::queue::BlockingQueue;
use crate::sync_signal::SyncSignal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Describes one collector group's contract: history depth consumed and the
/// symbolic "role" name that selects it. Created at startup, never mutated
/// after `collectors_ready`.
#[derive(Debug, Clone)]
pub struct GroupStat {
    pub gid: usize,
    pub hist_len: usize,
    pub name: Option<String>,
}

/// Per-game bookkeeping a group keeps purely for `print_summary` diagnostics.
/// The group performs no gating of its own — see `SPEC_FULL.md` Design Notes
/// for why the source's redundant `CollectCondition` re-check was dropped.
#[derive(Debug, Default, Clone, Copy)]
struct CollectPerGame {
    freq_send: u64,
}

/// One batching pipeline bound to a `Comm` for its lifetime.
pub struct CollectorGroup<S: GameState> {
    gid: usize,
    hist_len: usize,
    batch_size: AtomicUsize,
    batch_collector: BatchCollector<Arc<Info<S>>>,
    current_batch: Mutex<Vec<Arc<Info<S>>>>,
    data_addr: Box<dyn DataAddr<S>>,
    signal: Arc<SyncSignal>,
    wakeup: BlockingQueue<Duration>,
    per_game: Mutex<HashMap<Key, CollectPerGame>>,
    num_enqueue: AtomicU64,
    num_batches: AtomicU64,
    verbose: bool,
    timeout: Option<Duration>,
}

impl<S: GameState> CollectorGroup<S> {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gid: usize,
        keys: impl IntoIterator<Item = Key>,
        batch_size: usize,
        hist_len: usize,
        timeout: Option<Duration>,
        data_addr: Box<dyn DataAddr<S>>,
        signal: Arc<SyncSignal>,
        verbose: bool,
    ) -> Self {
        Self {
            gid,
            hist_len,
            batch_size: AtomicUsize::new(batch_size.max(1)),
            batch_collector: BatchCollector::new(keys),
            current_batch: Mutex::new(Vec::new()),
            data_addr,
            signal,
            wakeup: BlockingQueue::new(),
            per_game: Mutex::new(HashMap::new()),
            num_enqueue: AtomicU64::new(0),
            num_batches: AtomicU64::new(0),
            verbose,
            timeout,
        }
    }

    /// The optional per-group timeout passed to `add_collectors`. Not used
    /// internally by the group's own `wait_batch` (which always blocks
    /// indefinitely, matching the source's `MainLoop`); exposed so a daemon
    /// can honor it when calling `Comm::wait_group_batch_data`.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn gid(&self) -> usize {
        self.gid
    }

    #[must_use]
    pub fn hist_len(&self) -> usize {
        self.hist_len
    }

    #[must_use]
    pub fn num_enqueue(&self) -> u64 {
        self.num_enqueue.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn num_batches(&self) -> u64 {
        self.num_batches.load(Ordering::Relaxed)
    }

    pub fn set_batch_size(&self, batch_size: usize) {
        self.batch_size.store(batch_size.max(1), Ordering::Release);
    }

    /// Game side: records the send and inserts it into the internal batch
    /// collector. Gating already happened in `Comm::send_data_wait_reply`.
    pub fn send_data(&self, key: Key, info: Arc<Info<S>>) -> Result<(), CommError> {
        {
            let mut per_game = self.per_game.lock().unwrap();
            per_game.entry(key).or_default().freq_send += 1;
        }
        self.num_enqueue.fetch_add(1, Ordering::Relaxed);
        if self.verbose {
            eprintln!("[{key}][group {}] send_data", self.gid);
        }
        self.batch_collector.send_data(key, info)
    }

    pub fn wait_reply(&self, key: Key) -> Result<(), CommError> {
        if self.verbose {
            eprintln!("[group {}] wait_reply for key {key}", self.gid);
        }
        self.batch_collector.wait_reply(key)
    }

    /// Main loop: runs on its own dedicated thread for the lifetime of the
    /// group. Returns once it observes the shutdown marker.
    pub fn run(&self) {
        if self.verbose {
            eprintln!(
                "[group {}] starting main loop, hist_len = {}",
                self.gid, self.hist_len
            );
        }
        loop {
            let batch_size = self.batch_size.load(Ordering::Acquire);
            let batch = match self.batch_collector.wait_batch(batch_size) {
                BatchOutcome::Shutdown => break,
                BatchOutcome::Batch(items) => items,
            };
            crate::invariants::debug_assert_batch_bounds!(batch.len(), batch_size);

            let infos: Vec<Arc<Info<S>>> = batch.into_iter().map(|(_, v)| v).collect();
            *self.current_batch.lock().unwrap() = infos.clone();

            if self.verbose {
                eprintln!("[group {}] got batch of {}", self.gid, infos.len());
            }
            self.data_addr.get_inputs(&infos);

            self.num_batches.fetch_add(1, Ordering::Relaxed);
            self.signal.push(self.gid as i32, infos.len());

            let future_timeout = self.wakeup.wait_dequeue();
            let _ = future_timeout;

            self.data_addr.put_replies(&infos);

            for info in &infos {
                let _ = self.batch_collector.signal_reply(info.meta.query_id);
            }
            if self.verbose {
                eprintln!("[group {}] resumed {} games", self.gid, infos.len());
            }
        }
        if self.verbose {
            eprintln!("[group {}] collector ends", self.gid);
        }
        self.signal.done_notif().notify();
    }

    /// Daemon side: the keys that made up the batch currently awaiting
    /// `signal_batch_used`.
    #[must_use]
    pub fn batch_keys(&self) -> Vec<Key> {
        self.current_batch
            .lock()
            .unwrap()
            .iter()
            .map(|info| info.meta.query_id)
            .collect()
    }

    /// Releases the group's main loop from its post-`signal.push` wait.
    pub fn signal_batch_used(&self, future_timeout: Duration) {
        self.wakeup.enqueue(future_timeout);
    }

    /// Kicks the group out of a blocked `wait_batch` during shutdown.
    pub fn notify_awake(&self) {
        self.batch_collector.send_shutdown();
    }

    pub fn print_summary(&self) {
        let num_enqueue = self.num_enqueue.load(Ordering::Relaxed);
        println!("Group[{}]: HistLen = {}", self.gid, self.hist_len);
        println!("[{}]: #Enqueue: {num_enqueue}", self.gid);
        for (key, stat) in self.per_game.lock().unwrap().iter() {
            let ratio = if num_enqueue == 0 {
                0.0
            } else {
                stat.freq_send as f64 / num_enqueue as f64
            };
            println!("[{}][{key}]: #Send[{}/{ratio:.4}]", self.gid, stat.freq_send);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_addr::NullDataAddr;

    #[derive(Default, Clone, Copy)]
    struct Dummy;
    impl GameState for Dummy {}

    #[test]
    fn notify_awake_breaks_the_main_loop() {
        let signal = Arc::new(SyncSignal::new(1, false));
        let group = Arc::new(CollectorGroup::<Dummy>::new(
            0,
            [1u32],
            1,
            1,
            None,
            Box::new(NullDataAddr),
            Arc::clone(&signal),
            false,
        ));
        let g2 = Arc::clone(&group);
        let handle = std::thread::spawn(move || g2.run());
        group.notify_awake();
        signal.done_notif().wait(1);
        handle.join().unwrap();
    }
}
