//! Per-game front end: `prepare` / `send_data_wait_reply` / `restart`.

use crate::comm::Comm;
use crate::error::CommError;
use crate::game_state::GameState;
use crate::hist::Hist;
use crate::key::MetaInfo;
use crate::seq::SeqInfo;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

/// One game's current observation/reply payload.
///
/// Composes `MetaInfo` with a history of the user's `GameState` and a
/// snapshot of the producing `SeqInfo`. Referenced — never copied — into
/// collector-group batches via `Arc`; only one side (the owning `AiComm` or a
/// collector group mid-batch) touches the locked fields at a time, so
/// contention on either mutex is never expected in practice.
pub struct Info<S: GameState> {
    pub meta: MetaInfo,
    pub(crate) seq: Mutex<SeqInfo>,
    pub data: Mutex<Hist<S>>,
}

impl<S: GameState> Info<S> {
    fn new(meta: MetaInfo, hist_len: usize) -> Self {
        Self {
            meta,
            seq: Mutex::new(SeqInfo::new()),
            data: Mutex::new(Hist::new(hist_len)),
        }
    }

    /// Snapshot of the `SeqInfo` captured at the last `prepare()` call.
    #[must_use]
    pub fn seq_snapshot(&self) -> SeqInfo {
        *self.seq.lock().unwrap()
    }
}

/// Per-game wrapper providing the `prepare / send_data_wait_reply / restart`
/// cycle. Owns a per-game RNG seeded deterministically from its query id, so
/// runs are reproducible given the same key assignment.
pub struct AiComm<S: GameState> {
    comm: Arc<Comm<S>>,
    info: Arc<Info<S>>,
    curr_seq: SeqInfo,
    rng: StdRng,
}

impl<S: GameState> AiComm<S> {
    /// Builds the `AiComm` for a game's own main query.
    #[must_use]
    pub fn new(game_id: u32, hist_len: usize, comm: Arc<Comm<S>>) -> Self {
        let meta = MetaInfo::new(game_id);
        Self::from_meta(meta, hist_len, comm)
    }

    /// Spawns a child `AiComm` for a sub-agent thread of the same game.
    #[must_use]
    pub fn spawn(&self, thread_id: i32, hist_len: usize) -> Self {
        let meta = MetaInfo::child(&self.info.meta, thread_id);
        Self::from_meta(meta, hist_len, Arc::clone(&self.comm))
    }

    fn from_meta(meta: MetaInfo, hist_len: usize, comm: Arc<Comm<S>>) -> Self {
        let rng = StdRng::seed_from_u64(u64::from(meta.query_id));
        Self {
            comm,
            info: Arc::new(Info::new(meta, hist_len)),
            curr_seq: SeqInfo::new(),
            rng,
        }
    }

    #[must_use]
    pub fn meta(&self) -> MetaInfo {
        self.info.meta
    }

    #[must_use]
    pub fn seq_info(&self) -> SeqInfo {
        self.curr_seq
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Publishes the current `SeqInfo` snapshot, pushes a fresh default
    /// record into the history, then advances `curr_seq` for the *next*
    /// call. The record pushed by this call is populated afterward via
    /// [`AiComm::with_state`] — this mirrors the source's two-step
    /// `Prepare` then fill-in-place sequence.
    pub fn prepare(&mut self) {
        {
            let mut seq_slot = self.info.seq.lock().unwrap();
            *seq_slot = self.curr_seq;
        }
        {
            let mut hist = self.info.data.lock().unwrap();
            hist.push(S::default());
        }
        self.curr_seq.inc();
    }

    /// Mutable access to the record just pushed by `prepare()`.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut hist = self.info.data.lock().unwrap();
        f(hist.newest_mut())
    }

    /// Offers the current step to the `Comm`, blocking until every group
    /// that accepted it has both consumed and replied.
    pub fn send_data_wait_reply(&self) -> Result<(), CommError> {
        self.comm.send_data_wait_reply(self.info.meta.query_id, &self.info)
    }

    /// Starts a new episode: bumps `game_counter`, resets `seq` to 0, and
    /// marks the next `prepare()` as the first step of the episode. Does
    /// **not** clear history — old observations remain visible until pushed
    /// out naturally.
    pub fn restart(&mut self) {
        self.curr_seq.new_episode();
    }
}
