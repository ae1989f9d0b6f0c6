//! Toy game loop and fake daemon that exercise `elf-core`'s rendezvous end to
//! end: a downstream crate in the same workspace, the way the teacher's
//! `span_collector` crate sat alongside its core channel crate.
//!
//! `bin/demo.rs` wires [`counter_game::counter_game_loop`] and
//! [`echo_daemon::EchoDataAddr`] into a running [`elf_core::Context`].

pub mod counter_game;
pub mod echo_daemon;

pub use counter_game::{counter_game_loop, CounterState};
pub use echo_daemon::EchoDataAddr;
