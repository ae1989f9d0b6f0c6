//! Runs a handful of toy games against an in-process daemon using
//! `elf-core`'s rendezvous, end to end: each game ticks upward, the daemon
//! echoes back the negated tick, and the demo prints batching statistics on
//! exit.
//!
//! ```bash
//! cargo run -p elf-demo --bin demo -- --verbose
//! ```

use elf_core::{Context, ContextOptions, GroupStat};
use elf_demo::{counter_game_loop, CounterState, EchoDataAddr};
use std::sync::Arc;
use std::time::Duration;

const NUM_GAMES: usize = 8;
const BATCH_SIZE: usize = 4;
const STEPS_PER_EPISODE: usize = 10;
const EPISODES: usize = 3;
const HIST_LEN: usize = 2;

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");

    let options = ContextOptions {
        num_games: NUM_GAMES,
        max_num_threads: 1,
        hist_len: HIST_LEN,
        verbose_comm: verbose,
        verbose_collector: verbose,
        wait_per_group: false,
    };

    let ctx = Arc::new(Context::<CounterState>::new(options, 1));
    ctx.add_collectors(
        BATCH_SIZE,
        0,
        None,
        // `None` is a wildcard: this single group accepts every game regardless
        // of its `GameState::name()`, so it isn't tied to one name.
        GroupStat { gid: 0, hist_len: HIST_LEN, name: None },
        Box::new(EchoDataAddr::new(verbose)),
    )
    .expect("single collector group registration cannot fail");

    let game_loop = Arc::new(counter_game_loop(STEPS_PER_EPISODE, EPISODES, HIST_LEN));
    ctx.start(game_loop).expect("Context::start called exactly once");

    println!(
        "running {NUM_GAMES} games x {EPISODES} episodes x {STEPS_PER_EPISODE} steps, batch size {BATCH_SIZE}"
    );

    let total_steps = NUM_GAMES * STEPS_PER_EPISODE * EPISODES;
    let mut processed = 0usize;
    while processed < total_steps {
        let infos = ctx.wait(Some(Duration::from_millis(500)));
        if infos.is_timeout() {
            continue;
        }
        processed += infos.batch_size;
        ctx.steps(infos, Duration::ZERO).expect("steps cannot fail with a live group");
    }

    if verbose {
        ctx.print_summary();
    }

    for group in ctx.group_metrics() {
        println!(
            "group {}: {} batches, {} observations enqueued",
            group.gid, group.num_batches, group.num_enqueue
        );
    }

    ctx.stop();
    println!("done");
}
