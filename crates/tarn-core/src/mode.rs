//! Growth policies an arena can be created with.

use std::fmt;

/// How an arena obtains more memory once its current backing is full.
///
/// The mode is chosen at creation and never changes for the lifetime of
/// the arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GrowthMode {
    /// One heap buffer of fixed capacity. Running out is fatal.
    Fixed,
    /// A list of heap chunks; a new chunk is linked when the current one
    /// is full.
    #[default]
    Chain,
    /// One large virtual reservation, backed by pages committed on demand.
    ReserveCommit,
    /// Like [`GrowthMode::ReserveCommit`], but once the reservation is
    /// exhausted the arena continues in heap chunks placed after it.
    ReserveCommitThenChain,
}

impl GrowthMode {
    /// Every mode, in declaration order.
    pub const ALL: [GrowthMode; 4] = [
        GrowthMode::Fixed,
        GrowthMode::Chain,
        GrowthMode::ReserveCommit,
        GrowthMode::ReserveCommitThenChain,
    ];

    /// Whether this mode reserves virtual address space.
    pub fn uses_reservation(self) -> bool {
        matches!(self, Self::ReserveCommit | Self::ReserveCommitThenChain)
    }

    /// Whether this mode can link heap chunks.
    pub fn uses_chunks(self) -> bool {
        matches!(self, Self::Chain | Self::ReserveCommitThenChain)
    }

    /// Whether the arena can grow past its initial backing at all.
    pub fn can_grow(self) -> bool {
        !matches!(self, Self::Fixed)
    }
}

impl fmt::Display for GrowthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fixed => "fixed",
            Self::Chain => "chain",
            Self::ReserveCommit => "reserve-commit",
            Self::ReserveCommitThenChain => "reserve-commit-then-chain",
        };
        f.write_str(name)
    }
}
