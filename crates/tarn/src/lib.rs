//! Tarn: region-based bump allocation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Tarn sub-crates. For most users, adding `tarn` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tarn::prelude::*;
//!
//! // Chunks of 64 KiB, linked as the arena fills up.
//! let mut arena = Arena::new(ArenaConfig::chain(64 * 1024)).unwrap();
//!
//! let header = arena.push_value([0u32; 4]);
//! let mark = arena.pos();
//!
//! // Scratch space, released in one step.
//! let scratch = arena.push_array::<u64>(100_000);
//! assert_eq!(scratch.as_ptr() as usize % 8, 0);
//! assert!(arena.chunk_count() > 1);
//!
//! arena.pop_to(mark);
//! assert_eq!(arena.pos(), mark);
//! assert_eq!(unsafe { *header.as_ptr() }, [0; 4]);
//!
//! arena.release().unwrap();
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `tarn-arena` | `Arena`, configuration, chunks, reservations, metrics |
//! | [`types`] | `tarn-core` | Positions, growth modes, alignment, the page provider trait |
//! | [`os`] | `tarn-os` | The native virtual memory provider |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Arenas and their storage (`tarn-arena`).
///
/// Most users only need [`arena::Arena`] and [`arena::ArenaConfig`]; both
/// are also available in the [`prelude`].
pub use tarn_arena as arena;

/// Core types and traits (`tarn-core`).
///
/// Contains [`types::ArenaPos`], [`types::GrowthMode`], the alignment
/// helpers, and the [`types::PageProvider`] capability.
pub use tarn_core as types;

/// Native virtual memory (`tarn-os`).
///
/// [`os::SystemPages`] is the default page provider of every arena.
pub use tarn_os as os;

/// Common imports for typical Tarn usage.
///
/// ```rust
/// use tarn::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use tarn_arena::{Arena, ArenaConfig, ArenaMetrics, ArenaScope, OversizePolicy};

    // Core types
    pub use tarn_core::{ArenaPos, GrowthMode, PageProvider};

    // Errors
    pub use tarn_arena::ArenaError;
    pub use tarn_core::PageError;

    // OS
    pub use tarn_os::SystemPages;
}
