//! Bump-allocated arenas with four growth policies.
//!
//! An [`Arena`] hands out memory by advancing a cursor and takes it back by
//! rewinding the cursor to a saved [`ArenaPos`]. There is no per-object
//! free. What differs between arenas is how they get more memory when the
//! cursor reaches the end:
//!
//! ```text
//! Arena (cursor, auto-align, metrics)
//! └── Backing
//!     ├── Fixed                  HeapBlock, never grows
//!     ├── Chain                  ChunkPool → Chunk[] (heap, linked on demand)
//!     ├── ReserveCommit          Reservation (OS pages committed on demand)
//!     └── ReserveCommitThenChain Reservation, then ChunkPool past its end
//! ```
//!
//! Every mode addresses memory with the same logical positions, so code
//! that pushes, saves a position and rewinds behaves identically whichever
//! mode the arena was built with.
//!
//! # Failure model
//!
//! Construction returns [`ArenaError`]. Allocation through [`Arena::push`]
//! and friends panics when the arena cannot grow, after logging the cause
//! at `error` level; [`Arena::try_push`] returns the error instead. A
//! decommit refused by the OS during a rewind is logged, counted in
//! [`ArenaMetrics`], and otherwise ignored.
//!
//! # Safety
//!
//! `unsafe` is confined to the raw placement arithmetic, the
//! reservation's calls into its [`PageProvider`], and the zero-fill and
//! typed writes in the arena core.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod arena;
pub mod chunk;
pub mod config;
pub mod error;
mod growth;
pub mod metrics;
mod raw;
pub mod reservation;
pub mod scope;

pub use arena::Arena;
pub use chunk::{Chunk, ChunkPool};
pub use config::{ArenaConfig, OversizePolicy};
pub use error::ArenaError;
pub use metrics::ArenaMetrics;
pub use reservation::Reservation;
pub use scope::ArenaScope;

pub use tarn_core::{ArenaPos, GrowthMode, PageProvider};
pub use tarn_os::SystemPages;
