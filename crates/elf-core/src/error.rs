//! Error taxonomy for the rendezvous core.
//!
//! Every fallible public entry point returns `Result<T, CommError>`. Programmer
//! errors (unknown keys, setup misuse) are the only cases represented here;
//! transient conditions like a `wait_batch_data` timeout are modeled as plain
//! data (`Infos { gid: -1, .. }`), not errors, since the caller is expected to
//! retry them as a matter of course.

use crate::key::Key;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("key {0} is not registered with this Comm")]
    KeyNotFound(Key),

    #[error("collectors_ready was already called once")]
    AlreadyReady,

    #[error("collectors_ready called with zero collector groups registered")]
    NoCollectors,

    #[error("group {0} is not a valid group id")]
    GroupNotFound(usize),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
