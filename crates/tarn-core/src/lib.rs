//! Core types and traits for the Tarn arena allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: arena positions,
//! growth modes, alignment arithmetic, and the [`PageProvider`] capability
//! through which the arena talks to the operating system's virtual memory.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod align;
pub mod mode;
pub mod page;
pub mod pos;

pub use align::{align_down, align_up, is_power_of_two};
pub use mode::GrowthMode;
pub use page::{PageError, PageOp, PageProvider};
pub use pos::ArenaPos;
