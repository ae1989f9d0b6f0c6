//! The rendezvous each game talks to: `Comm<S>`.
//!
//! Owns the collector groups, the per-key `Stat` table, and the exclusive-class
//! membership list built at startup. `send_data_wait_reply` is the only entry
//! point a game thread calls; `wait_batch_data`/`steps` are the daemon's.

use crate::ai_comm::Info;
use crate::data_addr::DataAddr;
use crate::error::CommError;
use crate::game_state::GameState;
use crate::group::{CollectorGroup, GroupStat};
use crate::key::Key;
use crate::metrics::{GroupMetrics, KeyMetrics};
use crate::notif::Notif;
use crate::sync_signal::{Infos, SyncSignal};
use crossbeam_utils::CachePadded;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// `hist_overlap` as used by the decimation check in `CondPerGroup::check`.
/// Kept as a crate constant rather than exposed through `ContextOptions` — see
/// `SPEC_FULL.md` Design Notes, Open Questions.
const HIST_OVERLAP: u64 = 1;

/// Per-key traffic counter, cache-line padded so two keys hammered by
/// different game threads never false-share.
struct Stat {
    freq: AtomicU64,
    accepted: AtomicU64,
    counter: Notif,
}

impl Stat {
    fn new() -> Self {
        Self {
            freq: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            counter: Notif::new(),
        }
    }
}

/// Per-(key, exclusive-class) bookkeeping: `last_used_seq`, `last_seq`,
/// `game_counter`, `freq_send`. Enforces hist-len and decimation policy.
#[derive(Debug, Default, Clone, Copy)]
struct CondPerGroup {
    last_used_seq: u64,
    last_seq: u64,
    game_counter: u64,
    freq_send: u64,
}

impl CondPerGroup {
    /// Evaluates gating for one step against one candidate group, mutating the
    /// watermark on acceptance.
    fn check<S: GameState>(&mut self, gstat: &GroupStat, info: &Info<S>) -> bool {
        let seq = info.seq_snapshot();
        let curr_seq = seq.seq;

        if seq.game_counter > self.game_counter {
            self.last_used_seq = self.last_used_seq.saturating_sub(self.last_seq + 1);
            self.game_counter = seq.game_counter;
        }
        self.last_seq = curr_seq;

        // An absent/empty group name is a wildcard that matches any record,
        // mirroring `ADD_COND_CHECK`'s `field_name.empty() || field_name ==
        // record.field_name` in the source: only a *non-empty* group name
        // constrains which records it accepts.
        let name_ok = if S::HAS_NAME {
            gstat.name.as_deref().map_or(true, |want| {
                let data = info.data.lock().unwrap();
                data.newest().and_then(GameState::name) == Some(want)
            })
        } else {
            true
        };

        let hist_len = gstat.hist_len as u64;
        let size_ok = info.data.lock().unwrap().size() as u64 >= hist_len;
        let decimation_ok = curr_seq.saturating_sub(self.last_used_seq) >= hist_len.saturating_sub(HIST_OVERLAP);

        if name_ok && size_ok && decimation_ok {
            self.last_used_seq = curr_seq;
            crate::invariants::debug_assert_cond_watermark_advanced!(self.last_used_seq, curr_seq);
            self.freq_send += 1;
            true
        } else {
            false
        }
    }
}

/// Self-throttling statistics: sleeps producers that are running faster than
/// the pack once the spread in a rolling window grows too wide. Advisory —
/// correctness of the rendezvous does not depend on it.
struct CommStats {
    window: Mutex<VecDeque<Duration>>,
}

const THROTTLE_WINDOW: usize = 1000;

impl CommStats {
    fn new() -> Self {
        Self {
            window: Mutex::new(VecDeque::with_capacity(THROTTLE_WINDOW)),
        }
    }

    /// Records one step's rendezvous latency; returns a sleep duration this
    /// caller should absorb if it has been running well ahead of the pack.
    fn record_and_throttle(&self, latency: Duration) -> Option<Duration> {
        let mut window = self.window.lock().unwrap();
        window.push_back(latency);
        if window.len() > THROTTLE_WINDOW {
            window.pop_front();
        }
        if window.len() < THROTTLE_WINDOW {
            return None;
        }
        let min = *window.iter().min()?;
        let max = *window.iter().max()?;
        if max <= min {
            return None;
        }
        let total: Duration = window.iter().sum();
        let avg = total / window.len() as u32;
        let spread = max - min;
        if spread.as_secs_f64() <= avg.as_secs_f64() / 30.0 {
            return None;
        }
        if latency >= avg {
            return None;
        }
        let closeness = (avg - latency).as_secs_f64() / spread.as_secs_f64();
        Some(Duration::from_secs_f64(closeness.clamp(0.0, 1.0) * spread.as_secs_f64()))
    }
}

/// The many-to-one batching rendezvous. Owns the groups, the per-key `Stat`
/// table, and the exclusive-class membership list.
///
/// Built in two phases: `add_collectors` calls while the caller still has
/// exclusive (`&mut`) access, then `collectors_ready` (also `&mut`) freezes
/// the group set and spawns one thread per group. The caller then wraps the
/// result in `Arc` to share it with game threads — from that point on only
/// the read-only `send_data_wait_reply`/`steps` paths are used.
pub struct Comm<S: GameState> {
    keys: Vec<Key>,
    num_groups: usize,
    groups: Vec<Arc<CollectorGroup<S>>>,
    exclusive_groups: Vec<Vec<GroupStat>>,
    stats: HashMap<Key, CachePadded<Stat>>,
    cond_per_group: HashMap<(Key, usize), Mutex<CondPerGroup>>,
    signal: Arc<SyncSignal>,
    group_threads: Vec<JoinHandle<()>>,
    verbose: bool,
    comm_stats: CommStats,
}

impl<S: GameState> Comm<S> {
    /// Builds an empty `Comm` over a fixed key set. `num_groups` must equal
    /// the number of `add_collectors` calls that will follow — it sizes the
    /// `SyncSignal`'s per-group queues up front. Call `add_collectors` one or
    /// more times, then `collectors_ready`, before sharing across threads.
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = Key>, num_groups: usize, wait_per_group: bool, verbose: bool) -> Self {
        let keys: Vec<Key> = keys.into_iter().collect();
        let stats = keys.iter().map(|&k| (k, CachePadded::new(Stat::new()))).collect();
        Self {
            keys,
            num_groups,
            groups: Vec::with_capacity(num_groups),
            exclusive_groups: Vec::new(),
            stats,
            cond_per_group: HashMap::new(),
            signal: Arc::new(SyncSignal::new(num_groups, wait_per_group)),
            group_threads: Vec::new(),
            verbose,
            comm_stats: CommStats::new(),
        }
    }

    /// Registers one collector group under `exclusive_id`'s class. Returns
    /// the new group's `gid`. Must be called before `collectors_ready`, and
    /// at most `num_groups` times.
    pub fn add_collectors(
        &mut self,
        batch_size: usize,
        exclusive_id: usize,
        timeout: Option<Duration>,
        mut gstat: GroupStat,
        data_addr: Box<dyn DataAddr<S>>,
    ) -> Result<usize, CommError> {
        if self.groups.len() >= self.num_groups {
            return Err(CommError::InvalidArgument(
                "add_collectors called more times than Comm::new's num_groups",
            ));
        }
        let gid = self.groups.len();
        gstat.gid = gid;

        let group = CollectorGroup::new(
            gid,
            self.keys.iter().copied(),
            batch_size,
            gstat.hist_len,
            timeout,
            data_addr,
            Arc::clone(&self.signal),
            self.verbose,
        );
        self.groups.push(Arc::new(group));

        if self.exclusive_groups.len() <= exclusive_id {
            self.exclusive_groups.resize(exclusive_id + 1, Vec::new());
        }
        self.exclusive_groups[exclusive_id].push(gstat);
        Ok(gid)
    }

    /// Freezes the group set, initializes per-key per-class gating state, and
    /// spawns one thread per group running its main loop.
    pub fn collectors_ready(&mut self) -> Result<(), CommError> {
        if self.groups.is_empty() {
            return Err(CommError::NoCollectors);
        }
        if self.groups.len() != self.num_groups {
            return Err(CommError::InvalidArgument(
                "collectors_ready called before every declared group was added",
            ));
        }

        for &key in &self.keys {
            for exclusive_id in 0..self.exclusive_groups.len() {
                self.cond_per_group.insert((key, exclusive_id), Mutex::new(CondPerGroup::default()));
            }
        }

        for group in &self.groups {
            let group = Arc::clone(group);
            self.group_threads.push(std::thread::spawn(move || group.run()));
        }
        Ok(())
    }

    /// Offers `info` to every exclusive class, blocks until every class that
    /// accepted it both delivered the batch to the daemon and received a
    /// reply, then returns.
    pub fn send_data_wait_reply(&self, key: Key, info: &Arc<Info<S>>) -> Result<(), CommError> {
        let start = std::time::Instant::now();
        let stat = self.stats.get(&key).ok_or(CommError::KeyNotFound(key))?;
        stat.freq.fetch_add(1, Ordering::Relaxed);
        stat.counter.reset();

        let mut accepted: Vec<usize> = Vec::with_capacity(self.exclusive_groups.len());
        for (exclusive_id, class) in self.exclusive_groups.iter().enumerate() {
            if class.is_empty() {
                continue;
            }
            let pick = if class.len() == 1 {
                0
            } else {
                rand::thread_rng().gen_range(0..class.len())
            };
            let gstat = &class[pick];
            let cond_mutex = self
                .cond_per_group
                .get(&(key, exclusive_id))
                .ok_or(CommError::KeyNotFound(key))?;
            let mut cond = cond_mutex.lock().unwrap();
            if cond.check(gstat, info) {
                accepted.push(gstat.gid);
            }
        }

        for &gid in &accepted {
            let group = self.groups.get(gid).ok_or(CommError::GroupNotFound(gid))?;
            group.send_data(key, Arc::clone(info))?;
            if self.verbose {
                eprintln!("[{key}] accepted by group {gid}");
            }
        }

        stat.accepted.fetch_add(accepted.len() as u64, Ordering::Relaxed);
        stat.counter.wait(accepted.len() as u64);

        for &gid in &accepted {
            self.groups[gid].wait_reply(key)?;
        }

        if let Some(sleep_for) = self.comm_stats.record_and_throttle(start.elapsed()) {
            std::thread::sleep(sleep_for);
        }
        Ok(())
    }

    /// Daemon side: one batch token from the shared queue.
    #[must_use]
    pub fn wait_batch_data(&self, timeout: Option<Duration>) -> Infos {
        self.signal.wait_batch(-1, timeout).unwrap_or_else(|_| Infos::none())
    }

    /// Daemon side: one batch token from a specific group's queue
    /// (`ContextOptions::wait_per_group`).
    pub fn wait_group_batch_data(&self, gid: usize, timeout: Option<Duration>) -> Result<Infos, CommError> {
        self.signal.wait_batch(gid as i32, timeout)
    }

    /// Daemon side: notifies every key in the batch exactly once, then
    /// releases the group's main loop to marshal replies and resume games.
    pub fn steps(&self, infos: Infos, future_timeout: Duration) -> Result<(), CommError> {
        if infos.is_timeout() {
            return Ok(());
        }
        let group = self.groups.get(infos.gid as usize).ok_or(CommError::GroupNotFound(infos.gid as usize))?;
        for key in group.batch_keys() {
            let stat = self.stats.get(&key).ok_or(CommError::KeyNotFound(key))?;
            stat.counter.notify();
        }
        group.signal_batch_used(future_timeout);
        Ok(())
    }

    #[must_use]
    pub fn groups(&self) -> &[Arc<CollectorGroup<S>>] {
        &self.groups
    }

    #[must_use]
    pub fn signal(&self) -> &Arc<SyncSignal> {
        &self.signal
    }

    #[must_use]
    pub fn key_metrics(&self, key: Key) -> Option<KeyMetrics> {
        let stat = self.stats.get(&key)?;
        Some(KeyMetrics {
            freq: stat.freq.load(Ordering::Relaxed),
            accepted: stat.accepted.load(Ordering::Relaxed),
        })
    }

    #[must_use]
    pub fn group_metrics(&self) -> Vec<GroupMetrics> {
        self.groups
            .iter()
            .map(|g| GroupMetrics {
                gid: g.gid(),
                num_enqueue: g.num_enqueue(),
                num_batches: g.num_batches(),
            })
            .collect()
    }

    /// Kicks every group's main loop out of `wait_batch` and joins its
    /// thread. Called exactly once, from `Context::stop`.
    pub fn shutdown_groups(&mut self) {
        for group in &self.groups {
            group.notify_awake();
        }
        self.signal.done_notif().wait(self.groups.len() as u64);
        for handle in self.group_threads.drain(..) {
            let _ = handle.join();
        }
    }

    pub fn print_summary(&self) {
        for (key, stat) in &self.stats {
            println!(
                "[{key}]: freq={} accepted={}",
                stat.freq.load(Ordering::Relaxed),
                stat.accepted.load(Ordering::Relaxed)
            );
        }
        for group in &self.groups {
            group.print_summary();
        }
    }
}
