//! End-to-end scenario tests S1-S6 from `SPEC_FULL.md` §8, driven with real
//! OS threads the way the teacher's own `tests/integration_tests.rs` drives
//! `Channel` with real producer/consumer threads rather than mocks.

use elf_core::key::{encode, Key};
use elf_core::{AiComm, Comm, Context, ContextOptions, DataAddr, GameState, GroupStat, Info, NullDataAddr, Signal};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
struct Reply {
    value: u32,
}
impl GameState for Reply {}

/// Writes a process-wide incrementing counter into each batch member's
/// newest history slot, simulating a daemon that replies with "step index".
#[derive(Default)]
struct CountingReplyAddr {
    counter: AtomicU64,
}

impl DataAddr<Reply> for CountingReplyAddr {
    fn get_inputs(&self, _batch: &[Arc<Info<Reply>>]) {}

    fn put_replies(&self, batch: &[Arc<Info<Reply>>]) {
        for info in batch {
            let v = self.counter.fetch_add(1, Ordering::SeqCst) as u32;
            info.data.lock().unwrap().newest_mut().value = v;
        }
    }
}

/// Sets a shared flag once this group's batch has been replied to, so a test
/// can observe "has this group finished its half of the rendezvous yet".
struct FlagAddr(Arc<AtomicBool>);

impl DataAddr<Reply> for FlagAddr {
    fn get_inputs(&self, _batch: &[Arc<Info<Reply>>]) {}
    fn put_replies(&self, _batch: &[Arc<Info<Reply>>]) {
        self.0.store(true, Ordering::Release);
    }
}

fn unwrap_and_shutdown(comm: Arc<Comm<Reply>>) {
    match Arc::try_unwrap(comm) {
        Ok(mut comm) => comm.shutdown_groups(),
        Err(_) => panic!("comm still has outstanding references at shutdown"),
    }
}

// S1: 1 game, 1 group, hist_len = 1, batch_size = 1. Advance 5 steps; daemon
// replies with an incrementing integer. The game must see 0,1,2,3,4 in order;
// Stat.freq == 5; group.num_enqueue == 5.
#[test]
fn s1_single_game_single_group_batch_size_one() {
    let key = encode(0, -1);
    let mut comm = Comm::<Reply>::new([key], 1, false, false);
    comm.add_collectors(1, 0, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(CountingReplyAddr::default()))
        .unwrap();
    comm.collectors_ready().unwrap();
    let comm = Arc::new(comm);

    let mut ai = AiComm::new(0, 1, Arc::clone(&comm));
    let daemon = {
        let comm = Arc::clone(&comm);
        thread::spawn(move || {
            for _ in 0..5 {
                let infos = comm.wait_batch_data(Some(Duration::from_secs(1)));
                assert!(!infos.is_timeout(), "daemon timed out waiting for a batch");
                comm.steps(infos, Duration::ZERO).unwrap();
            }
        })
    };

    let mut replies = Vec::new();
    for _ in 0..5 {
        ai.prepare();
        ai.send_data_wait_reply().unwrap();
        replies.push(ai.with_state(|s| s.value));
    }
    daemon.join().unwrap();

    assert_eq!(replies, vec![0, 1, 2, 3, 4]);
    let km = comm.key_metrics(key).unwrap();
    assert_eq!(km.freq, 5);
    assert_eq!(km.accepted, 5);
    assert_eq!(comm.group_metrics()[0].num_enqueue, 5);

    drop(ai);
    unwrap_and_shutdown(comm);
}

// S2: 4 games, 1 group, batch_size = 4. Each game performs 3 steps. The
// daemon must receive exactly 3 batches of size 4; every game gets exactly 3
// replies.
#[test]
fn s2_batching_across_four_games() {
    const NUM_GAMES: u32 = 4;
    const STEPS: usize = 3;

    let keys: Vec<Key> = (0..NUM_GAMES).map(|g| encode(g, -1)).collect();
    let mut comm = Comm::<Reply>::new(keys, 1, false, false);
    comm.add_collectors(4, 0, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(NullDataAddr))
        .unwrap();
    comm.collectors_ready().unwrap();
    let comm = Arc::new(comm);

    let daemon = {
        let comm = Arc::clone(&comm);
        thread::spawn(move || {
            for _ in 0..STEPS {
                let infos = comm.wait_batch_data(Some(Duration::from_secs(1)));
                assert!(!infos.is_timeout());
                assert_eq!(infos.batch_size, NUM_GAMES as usize);
                comm.steps(infos, Duration::ZERO).unwrap();
            }
        })
    };

    let games: Vec<_> = (0..NUM_GAMES)
        .map(|g| {
            let comm = Arc::clone(&comm);
            thread::spawn(move || {
                let mut ai = AiComm::new(g, 1, comm);
                let mut replies = 0;
                for _ in 0..STEPS {
                    ai.prepare();
                    ai.send_data_wait_reply().unwrap();
                    replies += 1;
                }
                replies
            })
        })
        .collect();

    for g in games {
        assert_eq!(g.join().unwrap(), STEPS);
    }
    daemon.join().unwrap();

    assert_eq!(comm.group_metrics()[0].num_batches, STEPS as u64);
    assert_eq!(comm.group_metrics()[0].num_enqueue, (STEPS * NUM_GAMES as usize) as u64);

    unwrap_and_shutdown(comm);
}

// S3: 1 game, 1 group with hist_len = 4, hist_overlap = 1, batch_size = 1.
// Over 10 steps, acceptance happens only on steps 4, 7, 10.
#[test]
fn s3_hist_len_and_decimation_gating() {
    let key = encode(0, -1);
    let mut comm = Comm::<Reply>::new([key], 1, false, false);
    comm.add_collectors(1, 0, None, GroupStat { gid: 0, hist_len: 4, name: None }, Box::new(NullDataAddr))
        .unwrap();
    comm.collectors_ready().unwrap();
    let comm = Arc::new(comm);

    let batches = Arc::new(AtomicU64::new(0));
    let daemon_stop = Arc::new(AtomicBool::new(false));
    let daemon = {
        let comm = Arc::clone(&comm);
        let batches = Arc::clone(&batches);
        let daemon_stop = Arc::clone(&daemon_stop);
        thread::spawn(move || {
            while !daemon_stop.load(Ordering::Acquire) {
                let infos = comm.wait_batch_data(Some(Duration::from_millis(20)));
                if !infos.is_timeout() {
                    batches.fetch_add(1, Ordering::Relaxed);
                    comm.steps(infos, Duration::ZERO).unwrap();
                }
            }
        })
    };

    let mut ai = AiComm::new(0, 4, Arc::clone(&comm));
    for _ in 0..10 {
        ai.prepare();
        ai.send_data_wait_reply().unwrap();
    }
    daemon_stop.store(true, Ordering::Release);
    daemon.join().unwrap();

    assert_eq!(batches.load(Ordering::Relaxed), 3, "expected acceptances on steps 4, 7, 10");
    assert_eq!(comm.group_metrics()[0].num_batches, 3);

    drop(ai);
    unwrap_and_shutdown(comm);
}

// S4: 2 games, 2 exclusive classes each with 1 group, batch_size = 2. A game
// must not return from send_data_wait_reply until *both* groups have
// replied, not just one.
#[test]
fn s4_two_exclusive_groups_block_until_both_reply() {
    let keys: Vec<Key> = (0..2u32).map(|g| encode(g, -1)).collect();
    let mut comm = Comm::<Reply>::new(keys, 2, false, false);

    let group0_done = Arc::new(AtomicBool::new(false));
    let group1_done = Arc::new(AtomicBool::new(false));
    comm.add_collectors(2, 0, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(FlagAddr(Arc::clone(&group0_done))))
        .unwrap();
    comm.add_collectors(2, 1, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(FlagAddr(Arc::clone(&group1_done))))
        .unwrap();
    comm.collectors_ready().unwrap();
    let comm = Arc::new(comm);

    let game_returned: Vec<Arc<AtomicBool>> = (0..2).map(|_| Arc::new(AtomicBool::new(false))).collect();
    let handles: Vec<_> = (0..2u32)
        .map(|g| {
            let comm = Arc::clone(&comm);
            let flag = Arc::clone(&game_returned[g as usize]);
            thread::spawn(move || {
                let mut ai = AiComm::new(g, 1, comm);
                ai.prepare();
                ai.send_data_wait_reply().unwrap();
                flag.store(true, Ordering::Release);
            })
        })
        .collect();

    // Consume the first of the two groups' batches (whichever arrives
    // first) and let the games block on the stat counter waiting for the
    // second.
    let first = comm.wait_batch_data(Some(Duration::from_secs(1)));
    assert!(!first.is_timeout());
    comm.steps(first, Duration::ZERO).unwrap();

    thread::sleep(Duration::from_millis(30));
    for flag in &game_returned {
        assert!(!flag.load(Ordering::Acquire), "game returned after only one of two groups replied");
    }

    let second = comm.wait_batch_data(Some(Duration::from_secs(1)));
    assert!(!second.is_timeout());
    comm.steps(second, Duration::ZERO).unwrap();

    for h in handles {
        h.join().unwrap();
    }
    assert!(group0_done.load(Ordering::Acquire));
    assert!(group1_done.load(Ordering::Acquire));
    for flag in &game_returned {
        assert!(flag.load(Ordering::Acquire));
    }

    unwrap_and_shutdown(comm);
}

// S5: a daemon waiting with no games active must see a timeout surfaced as
// gid == -1, and must not block past the requested duration.
#[test]
fn s5_timeout_path_returns_promptly() {
    let mut comm = Comm::<Reply>::new(Vec::<Key>::new(), 1, false, false);
    comm.add_collectors(1, 0, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(NullDataAddr))
        .unwrap();
    comm.collectors_ready().unwrap();

    let start = Instant::now();
    let infos = comm.wait_batch_data(Some(Duration::from_millis(1)));
    let elapsed = start.elapsed();

    assert!(infos.is_timeout());
    assert_eq!(infos.gid, -1);
    assert!(elapsed < Duration::from_millis(100), "timeout path took {elapsed:?}");

    comm.shutdown_groups();
}

// S6: 8 games, 2 groups, shutdown mid-run. Every game thread must exit
// within a bounded time and Context::stop must be idempotent.
#[test]
fn s6_shutdown_terminates_cleanly() {
    let options = ContextOptions {
        num_games: 8,
        max_num_threads: 1,
        hist_len: 1,
        verbose_comm: false,
        verbose_collector: false,
        wait_per_group: false,
    };
    let ctx = Arc::new(Context::<Reply>::new(options, 2));
    ctx.add_collectors(2, 0, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(CountingReplyAddr::default()))
        .unwrap();
    ctx.add_collectors(2, 1, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(CountingReplyAddr::default()))
        .unwrap();

    let game_loop = Arc::new(|game_idx: usize, signal: &Signal, comm: Arc<Comm<Reply>>| {
        let mut ai = AiComm::new(game_idx as u32, 1, comm);
        loop {
            if signal.is_done() {
                break;
            }
            ai.prepare();
            if ai.send_data_wait_reply().is_err() {
                break;
            }
        }
    });
    ctx.start(game_loop).unwrap();

    let daemon_stop = Arc::new(AtomicBool::new(false));
    let daemon = {
        let ctx = Arc::clone(&ctx);
        let daemon_stop = Arc::clone(&daemon_stop);
        thread::spawn(move || {
            while !daemon_stop.load(Ordering::Acquire) {
                let infos = ctx.wait(Some(Duration::from_millis(10)));
                if !infos.is_timeout() {
                    let _ = ctx.steps(infos, Duration::ZERO);
                }
            }
        })
    };

    thread::sleep(Duration::from_millis(30));

    let stop_start = Instant::now();
    ctx.stop();
    let stop_elapsed = stop_start.elapsed();
    assert!(stop_elapsed < Duration::from_secs(5), "stop() took {stop_elapsed:?}");

    // Idempotent: a second call must not hang or panic.
    ctx.stop();

    daemon_stop.store(true, Ordering::Release);
    daemon.join().unwrap();
}

// Also covers Testable Property 8's "process can be re-initialized" clause:
// a fresh Context with the same key space can be constructed right after.
#[test]
fn s6_context_can_be_reinitialized_after_shutdown() {
    for _ in 0..2 {
        let ctx = Context::<Reply>::new(ContextOptions::single_game(), 1);
        ctx.add_collectors(1, 0, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(NullDataAddr))
            .unwrap();
        let game_loop = Arc::new(|_game_idx: usize, _signal: &Signal, _comm: Arc<Comm<Reply>>| {});
        ctx.start(game_loop).unwrap();
        ctx.stop();
    }
}
