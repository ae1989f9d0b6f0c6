//! Per-key and per-group accounting counters.
//!
//! Plain `Copy` snapshot structs, mirroring the teacher's `metrics.rs`: no
//! metrics-export crate, just counters a caller can read and print.

/// Snapshot of one key's traffic through a `Comm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyMetrics {
    /// Number of `send_data_wait_reply` calls made for this key.
    pub freq: u64,
    /// Number of those calls accepted by at least one group.
    pub accepted: u64,
}

/// Snapshot of one `CollectorGroup`'s throughput.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupMetrics {
    pub gid: usize,
    pub num_enqueue: u64,
    pub num_batches: u64,
}
