//! The data-address collaborator: translates between a batch of `Info`s and
//! whatever the daemon actually consumes (tensors, an RPC payload, ...).
//!
//! Out of scope for this crate's own logic — marshalling details belong to
//! the embedding application — but the trait and a no-op implementation are
//! part of the ambient surface, the same way the teacher's `span_collector`
//! crate ships a `SpanExporter` trait plus a `NullExporter`.

use crate::ai_comm::Info;
use crate::game_state::GameState;
use std::sync::Arc;

/// Per-group collaborator invoked by [`crate::group::CollectorGroup::run`]
/// around the daemon hand-off.
pub trait DataAddr<S: GameState>: Send + Sync {
    /// Runs before `signal.push`: marshal observations out of the batch.
    fn get_inputs(&self, batch: &[Arc<Info<S>>]);

    /// Runs after `signal_batch_used`: marshal replies back into the batch.
    fn put_replies(&self, batch: &[Arc<Info<S>>]);
}

/// No-op [`DataAddr`], useful for tests and for composing a group that only
/// cares about the rendezvous timing, not actual payload marshalling.
pub struct NullDataAddr;

impl<S: GameState> DataAddr<S> for NullDataAddr {
    fn get_inputs(&self, _batch: &[Arc<Info<S>>]) {}
    fn put_replies(&self, _batch: &[Arc<Info<S>>]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestState;
    impl GameState for TestState {}

    #[test]
    fn null_data_addr_is_a_no_op() {
        let addr = NullDataAddr;
        DataAddr::<TestState>::get_inputs(&addr, &[]);
        DataAddr::<TestState>::put_replies(&addr, &[]);
    }
}
