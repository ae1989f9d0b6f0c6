//! Debug-only invariant checks.
//!
//! Each macro documents one invariant from `SPEC_FULL.md` §3/§8 and the call
//! sites that exercise it. All of them compile to nothing in release builds;
//! they exist to catch a broken invariant at the point it was broken, not to
//! recover from it.

/// INV-HIST-01: `Hist::size() <= Hist::maxlen()` after every mutation.
///
/// Used in: `Hist::push`.
macro_rules! debug_assert_hist_size {
    ($size:expr, $maxlen:expr) => {
        debug_assert!(
            $size <= $maxlen,
            "INV-HIST-01 violated: size {} > maxlen {}",
            $size,
            $maxlen
        );
    };
}

/// INV-SEQ-01: within one episode, `SeqInfo.seq` is strictly increasing
/// across consecutive `inc()` calls.
///
/// Used in: `SeqInfo::inc`.
macro_rules! debug_assert_seq_monotonic {
    ($prev:expr, $next:expr) => {
        debug_assert!(
            $next > $prev,
            "INV-SEQ-01 violated: seq went from {} to {}",
            $prev,
            $next
        );
    };
}

/// INV-COND-01: after `CondPerGroup::check` accepts a step, `last_used_seq`
/// equals the step's `curr_seq` (acceptance always advances the watermark).
///
/// Used in: `comm::CondPerGroup::check`.
macro_rules! debug_assert_cond_watermark_advanced {
    ($last_used_seq:expr, $curr_seq:expr) => {
        debug_assert_eq!(
            $last_used_seq, $curr_seq,
            "INV-COND-01 violated: watermark {} does not match accepted seq {}",
            $last_used_seq, $curr_seq
        );
    };
}

/// INV-NOTIF-01: each call to `Notif::notify` observes a strictly larger
/// count than before the call (the count only resets through `reset()`,
/// which is a different call path).
///
/// Used in: `Notif::notify`.
macro_rules! debug_assert_notif_monotonic {
    ($count:expr) => {
        debug_assert!($count > 0, "INV-NOTIF-01 violated: notify() produced count 0");
    };
}

/// INV-BATCH-01: a batch handed to a `DataAddr` collaborator has length
/// between 1 and the group's configured `batch_size`, inclusive — `wait_batch`
/// never returns an empty, non-shutdown batch.
///
/// Used in: `group::CollectorGroup::run`.
macro_rules! debug_assert_batch_bounds {
    ($len:expr, $batch_size:expr) => {
        debug_assert!(
            $len >= 1 && $len <= $batch_size,
            "INV-BATCH-01 violated: batch length {} outside [1, {}]",
            $len,
            $batch_size
        );
    };
}

pub(crate) use debug_assert_batch_bounds;
pub(crate) use debug_assert_cond_watermark_advanced;
pub(crate) use debug_assert_hist_size;
pub(crate) use debug_assert_notif_monotonic;
pub(crate) use debug_assert_seq_monotonic;
