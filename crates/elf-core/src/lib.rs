//! ELF core — the many-to-one batching rendezvous between parallel game
//! simulations and an external learner.
//!
//! This crate implements exactly the concurrency core described in
//! `SPEC_FULL.md`: a multi-producer blocking queue, a per-key collector, a
//! batching collector group, the `Comm` rendezvous, and the `Context` that
//! owns a game worker pool. Game rules, tensor marshalling, and the embedding
//! of a host runtime are external collaborators — see [`data_addr`] and
//! [`game_state`] for the traits that mark those seams.
//!
//! # Example
//!
//! ```
//! use elf_core::{AiComm, Comm, ContextOptions, GameState, GroupStat, NullDataAddr};
//! use std::sync::Arc;
//!
//! #[derive(Default, Clone, Copy)]
//! struct Board(u32);
//! impl GameState for Board {}
//!
//! let options = ContextOptions::single_game();
//! let keys = vec![elf_core::key::encode(0, -1)];
//! let mut comm = Comm::<Board>::new(keys, 1, options.wait_per_group, options.verbose_comm);
//! comm.add_collectors(1, 0, None, GroupStat { gid: 0, hist_len: 1, name: None }, Box::new(NullDataAddr))
//!     .unwrap();
//! comm.collectors_ready().unwrap();
//! let comm = Arc::new(comm);
//!
//! let mut ai = AiComm::new(0, options.hist_len, Arc::clone(&comm));
//! let daemon = std::thread::spawn(move || {
//!     let infos = comm.wait_batch_data(None);
//!     comm.steps(infos, std::time::Duration::ZERO).unwrap();
//! });
//! ai.prepare();
//! ai.send_data_wait_reply().unwrap();
//! daemon.join().unwrap();
//! ```

pub mod ai_comm;
pub mod collector;
pub mod comm;
pub mod config;
pub mod context;
pub mod data_addr;
pub mod error;
pub mod game_state;
pub mod group;
pub mod hist;
pub(crate) mod invariants;
pub mod key;
pub mod metrics;
pub mod notif;
pub mod queue;
pub mod seq;
pub mod sync_signal;

pub use ai_comm::{AiComm, Info};
pub use collector::{BatchCollector, BatchOutcome, Collected, Collector};
pub use comm::Comm;
pub use config::ContextOptions;
pub use context::{Context, GameLoop, Signal};
pub use data_addr::{DataAddr, NullDataAddr};
pub use error::CommError;
pub use game_state::GameState;
pub use group::{CollectorGroup, GroupStat};
pub use hist::Hist;
pub use key::{MetaInfo, Key};
pub use metrics::{GroupMetrics, KeyMetrics};
pub use notif::Notif;
pub use queue::BlockingQueue;
pub use seq::SeqInfo;
pub use sync_signal::{Infos, SyncSignal};
