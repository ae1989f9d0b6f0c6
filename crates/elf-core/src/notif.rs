//! Counting notification primitive.
//!
//! Used both as the process-wide shutdown flag (`Context::done`) and as the
//! per-game rendezvous counter (`Stat::counter`): `notify()` bumps a count
//! and broadcasts; `wait(n)` blocks until the count has reached at least `n`
//! since construction or the last `reset()`. `set()`/`get()` layer a sticky
//! boolean over the same state for the shutdown-flag use case.

use std::sync::{Condvar, Mutex};

#[derive(Default)]
struct State {
    count: u64,
    done: bool,
}

/// A `{count, cvar, mutex}` counting notification, per the source's `Notif`.
pub struct Notif {
    state: Mutex<State>,
    cvar: Condvar,
}

impl Default for Notif {
    fn default() -> Self {
        Self::new()
    }
}

impl Notif {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            cvar: Condvar::new(),
        }
    }

    /// Bumps the counter by one and wakes every waiter.
    pub fn notify(&self) {
        let mut state = self.state.lock().unwrap();
        state.count += 1;
        crate::invariants::debug_assert_notif_monotonic!(state.count);
        self.cvar.notify_all();
    }

    /// Blocks until the counter has reached at least `n` since the last
    /// `reset` (or construction).
    pub fn wait(&self, n: u64) {
        let guard = self.state.lock().unwrap();
        let _guard = self
            .cvar
            .wait_while(guard, |state| state.count < n)
            .unwrap();
    }

    /// Resets the counter to zero without affecting the sticky `done` flag.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.count = 0;
    }

    /// Sets the sticky flag and wakes every waiter (used for shutdown).
    pub fn set(&self) {
        let mut state = self.state.lock().unwrap();
        state.done = true;
        self.cvar.notify_all();
    }

    #[must_use]
    pub fn get(&self) -> bool {
        self.state.lock().unwrap().done
    }
}
