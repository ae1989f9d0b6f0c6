//! A daemon-side `DataAddr` that echoes back the negated tick for every
//! member of a batch. Stands in for the tensor-marshalling layer
//! `SPEC_FULL.md` §4.6 calls out as out of scope for `elf-core` itself.

use crate::counter_game::CounterState;
use elf_core::{DataAddr, Info};
use std::sync::Arc;

/// Logs incoming batches (when `verbose`) and writes `action = -(tick)` back
/// into each member on the reply pass.
pub struct EchoDataAddr {
    verbose: bool,
}

impl EchoDataAddr {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl DataAddr<CounterState> for EchoDataAddr {
    fn get_inputs(&self, batch: &[Arc<Info<CounterState>>]) {
        if self.verbose {
            let ticks: Vec<u32> = batch
                .iter()
                .map(|info| info.data.lock().unwrap().newest().map(|s| s.tick).unwrap_or_default())
                .collect();
            eprintln!("[echo_daemon] batch ticks = {ticks:?}");
        }
    }

    fn put_replies(&self, batch: &[Arc<Info<CounterState>>]) {
        for info in batch {
            let mut data = info.data.lock().unwrap();
            let tick = data.newest().map(|s| s.tick).unwrap_or_default();
            data.newest_mut().action = -(i32::try_from(tick).unwrap_or(i32::MAX));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter_game::counter_game_loop;
    use elf_core::{Context, ContextOptions, GroupStat};
    use std::time::Duration;

    #[test]
    fn put_replies_negates_the_observed_tick_end_to_end() {
        let options = ContextOptions::single_game();
        let ctx = Arc::new(Context::<CounterState>::new(options, 1));
        ctx.add_collectors(
            1,
            0,
            None,
            GroupStat { gid: 0, hist_len: 1, name: None },
            Box::new(EchoDataAddr::new(false)),
        )
        .unwrap();

        let game_loop = Arc::new(counter_game_loop(1, 1, 1));
        ctx.start(game_loop).unwrap();

        let infos = ctx.wait(Some(Duration::from_secs(1)));
        assert!(!infos.is_timeout());
        ctx.steps(infos, Duration::ZERO).unwrap();
        ctx.stop();
    }
}
