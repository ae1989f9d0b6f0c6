//! Owns the game worker pool and the `Comm`. Spawns one thread per game,
//! passes each game a `Signal` and an `Arc<Comm<S>>`, and drives the two-phase
//! shutdown described in `SPEC_FULL.md` §4.8.

use crate::comm::Comm;
use crate::config::ContextOptions;
use crate::error::CommError;
use crate::game_state::GameState;
use crate::key;
use crate::notif::Notif;
use crate::sync_signal::Infos;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// The pair of flags every game thread reads each iteration: `done` (process
/// is shutting down, stop now) and `prepare_stop` (shutdown has started,
/// finish the in-flight step but don't start a new episode if avoidable).
#[derive(Clone)]
pub struct Signal {
    done: Arc<Notif>,
    prepare_stop: Arc<AtomicBool>,
}

impl Signal {
    fn new() -> Self {
        Self {
            done: Arc::new(Notif::new()),
            prepare_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.get()
    }

    #[must_use]
    pub fn is_prepare_stop(&self) -> bool {
        self.prepare_stop.load(Ordering::Acquire)
    }
}

/// A game's main loop: constructed once per game index, run on its own
/// thread, and expected to check `signal.is_done()` periodically.
pub trait GameLoop<S: GameState>: Send + Sync + 'static {
    fn run(&self, game_idx: usize, signal: &Signal, comm: Arc<Comm<S>>);
}

impl<S: GameState, F: Fn(usize, &Signal, Arc<Comm<S>>) + Send + Sync + 'static> GameLoop<S> for F {
    fn run(&self, game_idx: usize, signal: &Signal, comm: Arc<Comm<S>>) {
        self(game_idx, signal, comm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextState {
    NotStarted,
    Running,
    Stopped,
}

/// Owns the `Comm` (once started, shared via `Arc`), the game worker threads,
/// and the shutdown `Signal`.
pub struct Context<S: GameState> {
    options: ContextOptions,
    comm_builder: Mutex<Option<Comm<S>>>,
    comm: Mutex<Option<Arc<Comm<S>>>>,
    signal: Signal,
    game_threads: Mutex<Vec<JoinHandle<()>>>,
    state: Mutex<ContextState>,
}

impl<S: GameState> Context<S> {
    /// Builds the key space from `options` (`num_games` games, each with its
    /// own main query plus up to `max_num_threads` sub-agent queries) and an
    /// empty `Comm` awaiting `add_collectors` calls.
    #[must_use]
    pub fn new(options: ContextOptions, num_groups: usize) -> Self {
        let keys: Vec<key::Key> = (0..options.num_games as u32)
            .flat_map(|game_id| (-1..options.max_num_threads as i32).map(move |t| key::encode(game_id, t)))
            .collect();
        let comm = Comm::new(keys, num_groups, options.wait_per_group, options.verbose_comm);
        Self {
            options,
            comm_builder: Mutex::new(Some(comm)),
            comm: Mutex::new(None),
            signal: Signal::new(),
            game_threads: Mutex::new(Vec::new()),
            state: Mutex::new(ContextState::NotStarted),
        }
    }

    /// Registers one collector group. Must be called before `start`.
    pub fn add_collectors(
        &self,
        batch_size: usize,
        exclusive_id: usize,
        timeout: Option<Duration>,
        gstat: crate::group::GroupStat,
        data_addr: Box<dyn crate::data_addr::DataAddr<S>>,
    ) -> Result<usize, CommError> {
        let mut builder = self.comm_builder.lock().unwrap();
        let comm = builder.as_mut().ok_or(CommError::AlreadyReady)?;
        comm.add_collectors(batch_size, exclusive_id, timeout, gstat, data_addr)
    }

    /// Freezes the `Comm`, spawns its group threads, then spawns one worker
    /// thread per game running `game_loop`.
    pub fn start(&self, game_loop: Arc<dyn GameLoop<S>>) -> Result<(), CommError> {
        let mut state = self.state.lock().unwrap();
        if *state != ContextState::NotStarted {
            return Err(CommError::InvalidArgument("Context::start called more than once"));
        }

        let mut comm = self.comm_builder.lock().unwrap().take().ok_or(CommError::AlreadyReady)?;
        comm.collectors_ready()?;
        let comm = Arc::new(comm);
        *self.comm.lock().unwrap() = Some(Arc::clone(&comm));

        let mut threads = self.game_threads.lock().unwrap();
        for game_idx in 0..self.options.num_games {
            let signal = self.signal.clone();
            let comm = Arc::clone(&comm);
            let game_loop = Arc::clone(&game_loop);
            let done = Arc::clone(&self.signal.done);
            threads.push(std::thread::spawn(move || {
                game_loop.run(game_idx, &signal, comm);
                done.notify();
            }));
        }
        *state = ContextState::Running;
        Ok(())
    }

    #[must_use]
    pub fn signal(&self) -> Signal {
        self.signal.clone()
    }

    /// Daemon side: one batch token, forwarded to the underlying `Comm`.
    #[must_use]
    pub fn wait(&self, timeout: Option<Duration>) -> Infos {
        match self.comm.lock().unwrap().as_ref() {
            Some(comm) => comm.wait_batch_data(timeout),
            None => Infos::none(),
        }
    }

    /// Daemon side: acknowledges a batch, forwarded to the underlying `Comm`.
    pub fn steps(&self, infos: Infos, future_timeout: Duration) -> Result<(), CommError> {
        let comm = self.comm.lock().unwrap();
        match comm.as_ref() {
            Some(comm) => comm.steps(infos, future_timeout),
            None => Ok(()),
        }
    }

    /// Per-group throughput counters, forwarded from the underlying `Comm`.
    /// Empty before `start` has been called.
    #[must_use]
    pub fn group_metrics(&self) -> Vec<crate::metrics::GroupMetrics> {
        match self.comm.lock().unwrap().as_ref() {
            Some(comm) => comm.group_metrics(),
            None => Vec::new(),
        }
    }

    /// Prints per-key and per-group accounting to stdout, forwarded from the
    /// underlying `Comm`. A no-op before `start`.
    pub fn print_summary(&self) {
        if let Some(comm) = self.comm.lock().unwrap().as_ref() {
            comm.print_summary();
        }
    }

    /// Two-phase shutdown. Idempotent: a second call is a no-op.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if *state != ContextState::Running {
                return;
            }
            *state = ContextState::Stopped;
        }

        let comm = match self.comm.lock().unwrap().clone() {
            Some(comm) => comm,
            None => return,
        };

        // Prepare: stop accepting new episodes, shrink batches to 1 so
        // in-flight partial batches complete, and keep draining the daemon
        // queue so a batch that fills right as shutdown begins still gets a
        // consumer (see SPEC_FULL.md §9, Open Questions resolution).
        self.signal.prepare_stop.store(true, Ordering::Release);
        for group in comm.groups() {
            group.set_batch_size(1);
        }

        let helper_stop = Arc::new(AtomicBool::new(false));
        let helper = {
            let helper_stop = Arc::clone(&helper_stop);
            let comm = Arc::clone(&comm);
            std::thread::spawn(move || {
                while !helper_stop.load(Ordering::Acquire) {
                    let infos = comm.wait_batch_data(Some(Duration::from_millis(20)));
                    if !infos.is_timeout() {
                        let _ = comm.steps(infos, Duration::ZERO);
                    }
                }
            })
        };

        // Stop: signal every game, wait for each to acknowledge exit, then
        // unblock every collector group and join its thread.
        self.signal.done.set();
        self.signal.done.wait(self.options.num_games as u64);

        helper_stop.store(true, Ordering::Release);
        helper.join().unwrap();

        let mut threads = self.game_threads.lock().unwrap();
        for handle in threads.drain(..) {
            let _ = handle.join();
        }

        if let Ok(mut comm) = Arc::try_unwrap(comm).map_err(|_| ()) {
            comm.shutdown_groups();
        }
    }
}

impl<S: GameState> Drop for Context<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_comm::AiComm;
    use crate::data_addr::NullDataAddr;
    use crate::group::GroupStat;
    use std::sync::atomic::AtomicU64;

    #[derive(Default, Clone, Copy)]
    struct Dummy(u32);
    impl GameState for Dummy {}

    #[test]
    fn single_game_single_group_round_trips_replies() {
        let options = ContextOptions::single_game();
        let ctx = Arc::new(Context::<Dummy>::new(options, 1));
        ctx.add_collectors(1, 0, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(NullDataAddr))
            .unwrap();

        let steps_done = Arc::new(AtomicU64::new(0));
        let steps_done2 = Arc::clone(&steps_done);
        let game_loop = Arc::new(move |game_idx: usize, signal: &Signal, comm: Arc<Comm<Dummy>>| {
            let mut ai = AiComm::new(game_idx as u32, 1, comm);
            for _ in 0..5 {
                if signal.is_done() {
                    break;
                }
                ai.prepare();
                ai.send_data_wait_reply().unwrap();
                steps_done2.fetch_add(1, Ordering::Relaxed);
            }
        });

        ctx.start(game_loop).unwrap();

        let daemon = {
            let ctx = Arc::clone(&ctx);
            std::thread::spawn(move || {
                for _ in 0..5 {
                    let infos = loop {
                        let infos = ctx.wait(Some(Duration::from_millis(200)));
                        if !infos.is_timeout() {
                            break infos;
                        }
                    };
                    ctx.steps(infos, Duration::ZERO).unwrap();
                }
            })
        };
        daemon.join().unwrap();

        // Give the game thread a moment to observe its final reply before
        // tearing the context down.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(steps_done.load(Ordering::Relaxed), 5);
        ctx.stop();
    }
}
