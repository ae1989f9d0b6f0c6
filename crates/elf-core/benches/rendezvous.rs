//! Micro-benchmark of `send_data_wait_reply` latency under batching.
//!
//! Does not commit to specific throughput numbers (see `SPEC_FULL.md`'s
//! ambient-engineering section) — it exists so a regression in the
//! rendezvous's hot path shows up as a `criterion` delta, the same role the
//! teacher's `[[bench]]` entries play for `Channel`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use elf_core::{AiComm, Comm, ContextOptions, GameState, GroupStat, NullDataAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Default, Clone, Copy)]
struct Obs;
impl GameState for Obs {}

fn run_games(num_games: usize, batch_size: usize, steps_per_game: usize) {
    let options = ContextOptions::throughput(num_games);
    let keys: Vec<_> = (0..num_games as u32).map(|g| elf_core::key::encode(g, -1)).collect();
    let mut comm = Comm::<Obs>::new(keys, 1, false, false);
    comm.add_collectors(
        batch_size,
        0,
        None,
        GroupStat { gid: 0, hist_len: 1, name: None },
        Box::new(NullDataAddr),
    )
    .unwrap();
    comm.collectors_ready().unwrap();
    let comm = Arc::new(comm);

    let done = Arc::new(AtomicBool::new(false));
    let daemon = {
        let comm = Arc::clone(&comm);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let infos = comm.wait_batch_data(Some(Duration::from_millis(50)));
                if !infos.is_timeout() {
                    comm.steps(infos, Duration::ZERO).unwrap();
                }
            }
        })
    };

    let games: Vec<_> = (0..num_games)
        .map(|g| {
            let comm = Arc::clone(&comm);
            thread::spawn(move || {
                let mut ai = AiComm::new(g as u32, options.hist_len, comm);
                for _ in 0..steps_per_game {
                    ai.prepare();
                    black_box(ai.send_data_wait_reply().unwrap());
                }
            })
        })
        .collect();
    for g in games {
        g.join().unwrap();
    }
    done.store(true, Ordering::Release);
    daemon.join().unwrap();
}

fn bench_rendezvous(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendezvous");
    for &num_games in &[1usize, 4, 16] {
        group.throughput(Throughput::Elements(num_games as u64 * 50));
        group.bench_with_input(BenchmarkId::new("steps_per_game_50", num_games), &num_games, |b, &num_games| {
            b.iter(|| run_games(num_games, num_games, 50));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rendezvous);
criterion_main!(benches);
