//! Run configuration for a `Context`.
//!
//! Mirrors the teacher's `config.rs` `Config`/named-presets convention: a
//! plain struct with a `Default` impl and a couple of preset constructors,
//! not a CLI or env-var parser.

/// Recognized options for building a `Context`.
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    /// Number of game worker threads to spawn.
    pub num_games: usize,
    /// Max extra threads per game; multiplies the key space (see `key::encode`).
    pub max_num_threads: usize,
    /// History length of the default `Hist` constructed per game.
    pub hist_len: usize,
    /// Toggles diagnostic `eprintln!` output from `Comm`/`AiComm`.
    pub verbose_comm: bool,
    /// Toggles diagnostic `eprintln!` output from `CollectorGroup`.
    pub verbose_collector: bool,
    /// When true, `SyncSignal` uses one queue per group instead of one shared queue.
    pub wait_per_group: bool,
}

impl ContextOptions {
    /// Single game, single group, minimal history — the smallest configuration
    /// that exercises the rendezvous end to end.
    #[must_use]
    pub fn single_game() -> Self {
        Self {
            num_games: 1,
            max_num_threads: 1,
            hist_len: 1,
            verbose_comm: false,
            verbose_collector: false,
            wait_per_group: false,
        }
    }

    /// Many games sharing one queue, sized for batching throughput rather
    /// than per-game latency.
    #[must_use]
    pub fn throughput(num_games: usize) -> Self {
        Self {
            num_games,
            max_num_threads: 1,
            hist_len: 1,
            verbose_comm: false,
            verbose_collector: false,
            wait_per_group: false,
        }
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self::single_game()
    }
}
