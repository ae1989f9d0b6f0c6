//! Fan-in channel carrying `(group_id, batch_size)` tokens from collector
//! groups to the daemon, plus the shared shutdown `Notif`.

use crate::error::CommError;
use crate::notif::Notif;
use crate::queue::BlockingQueue;
use std::time::Duration;

/// Token the sync signal passes to the daemon. `gid == -1` means
/// "no batch / timed out".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Infos {
    pub gid: i32,
    pub batch_size: usize,
}

impl Infos {
    #[must_use]
    pub fn new(gid: i32, batch_size: usize) -> Self {
        Self { gid, batch_size }
    }

    #[must_use]
    pub fn none() -> Self {
        Self { gid: -1, batch_size: 0 }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.gid < 0
    }
}

/// Either a single shared queue of `Infos`, or one queue per group when
/// `ContextOptions::wait_per_group` is set.
pub struct SyncSignal {
    shared: BlockingQueue<Infos>,
    per_group: Vec<BlockingQueue<Infos>>,
    done: Notif,
}

impl SyncSignal {
    #[must_use]
    pub fn new(num_groups: usize, wait_per_group: bool) -> Self {
        let per_group = if wait_per_group {
            (0..num_groups).map(|_| BlockingQueue::new()).collect()
        } else {
            Vec::new()
        };
        Self {
            shared: BlockingQueue::new(),
            per_group,
            done: Notif::new(),
        }
    }

    /// Selects the queue by `gid` and enqueues `(gid, batch_size)`.
    pub fn push(&self, gid: i32, batch_size: usize) {
        if self.per_group.is_empty() || gid < 0 {
            self.shared.enqueue(Infos::new(gid, batch_size));
        } else {
            self.per_group[gid as usize].enqueue(Infos::new(gid, batch_size));
        }
    }

    /// Waits on the chosen queue (shared, or per-group) depending on
    /// configuration. Times out to `Infos::none()` when `timeout` is given.
    pub fn wait_batch(&self, group_id: i32, timeout: Option<Duration>) -> Result<Infos, CommError> {
        let queue = if group_id < 0 && self.per_group.is_empty() {
            &self.shared
        } else if group_id >= 0 && !self.per_group.is_empty() {
            self.per_group
                .get(group_id as usize)
                .ok_or(CommError::GroupNotFound(group_id as usize))?
        } else {
            return Err(CommError::InvalidArgument(
                "wait_batch: group_id does not match the signal's queue mode",
            ));
        };
        Ok(match timeout {
            None => queue.wait_dequeue(),
            Some(d) => queue.wait_dequeue_timed(d).unwrap_or_else(Infos::none),
        })
    }

    #[must_use]
    pub fn done_notif(&self) -> &Notif {
        &self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_queue_round_trip() {
        let signal = SyncSignal::new(2, false);
        signal.push(0, 4);
        let infos = signal.wait_batch(-1, None).unwrap();
        assert_eq!(infos, Infos::new(0, 4));
    }

    #[test]
    fn per_group_queue_isolates_groups() {
        let signal = SyncSignal::new(2, true);
        signal.push(1, 3);
        let infos = signal.wait_batch(1, Some(Duration::from_millis(50))).unwrap();
        assert_eq!(infos, Infos::new(1, 3));
        // group 0's queue is untouched and times out.
        let timed_out = signal.wait_batch(0, Some(Duration::from_millis(5))).unwrap();
        assert!(timed_out.is_timeout());
    }

    #[test]
    fn timeout_surfaces_as_none() {
        let signal = SyncSignal::new(1, false);
        let infos = signal.wait_batch(-1, Some(Duration::from_millis(5))).unwrap();
        assert!(infos.is_timeout());
    }
}
