//! A toy game: each step observes a monotonically increasing tick and reads
//! back whatever the daemon wrote into `action`. Demonstrates the
//! `prepare` / `send_data_wait_reply` / `restart` cycle an embedding game
//! loop is expected to drive (`SPEC_FULL.md` §4.1, "Game collaborator").

use elf_core::{AiComm, Comm, GameState, Signal};
use std::sync::Arc;

/// One step's observation/reply pair. `tick` is populated by the game before
/// `send_data_wait_reply`; `action` is populated by the daemon (through a
/// `DataAddr`) before the game reads it back.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterState {
    pub tick: u32,
    pub action: i32,
}

impl GameState for CounterState {
    const HAS_NAME: bool = true;

    fn name(&self) -> Option<&str> {
        Some("counter")
    }
}

/// Builds a `GameLoop`-compatible closure that runs `episodes` episodes of
/// `steps_per_episode` steps each, calling `AiComm::restart` between them and
/// bailing out early if `Signal::is_done` fires mid-episode.
#[must_use]
pub fn counter_game_loop(
    steps_per_episode: usize,
    episodes: usize,
    hist_len: usize,
) -> impl Fn(usize, &Signal, Arc<Comm<CounterState>>) + Send + Sync + 'static {
    move |game_idx, signal, comm| {
        let mut ai = AiComm::new(game_idx as u32, hist_len, comm);
        let mut tick = 0u32;
        'episodes: for _ in 0..episodes {
            for step in 0..steps_per_episode {
                if signal.is_done() {
                    break 'episodes;
                }
                ai.prepare();
                ai.with_state(|s| s.tick = tick);
                if ai.send_data_wait_reply().is_err() {
                    break 'episodes;
                }
                tick += 1;
                let _action = ai.with_state(|s| s.action);
                if step + 1 == steps_per_episode {
                    ai.restart();
                }
            }
        }
    }
}
