//! The growth policy engine.
//!
//! [`Backing`] is the mode-tagged storage behind an arena. The arena core
//! asks it to place each request with [`Backing::try_fit`]; on a miss it
//! calls [`Backing::grow`], which decides per mode whether to fail, commit
//! more pages, or move into heap chunks.
//!
//! ```text
//! Fixed                   [ heap buffer ...................... ] -> fatal
//! Chain                   [ chunk 0 ][ chunk 1 ][ chunk 2 ] ... -> link chunk
//! ReserveCommit           [ committed | reserved ............ ] -> commit, else fatal
//! ReserveCommitThenChain  [ committed | reserved ][ chunk 0 ] .. -> commit, else chunks
//! ```
//!
//! In the hybrid mode chunk 0 starts at the logical position where the
//! reservation ends, so one cursor addresses both regions.

use tarn_core::{GrowthMode, PageProvider};

use crate::chunk::ChunkPool;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::metrics::ArenaMetrics;
use crate::raw::{place, HeapBlock, Placement};
use crate::reservation::Reservation;

/// Storage behind an arena, one variant per [`GrowthMode`].
pub(crate) enum Backing<P: PageProvider> {
    Fixed(HeapBlock),
    Chain(ChunkPool),
    Reserve(Reservation<P>),
    Hybrid {
        reservation: Reservation<P>,
        pool: ChunkPool,
        /// Set once the reservation ran out. Never cleared.
        spilled: bool,
    },
}

impl<P: PageProvider> Backing<P> {
    /// Acquire the initial storage for `config`. Nothing leaks on failure.
    pub(crate) fn new(config: &ArenaConfig, provider: P) -> Result<Self, ArenaError> {
        Ok(match config.mode {
            GrowthMode::Fixed => Self::Fixed(HeapBlock::new(config.capacity)?),
            GrowthMode::Chain => Self::Chain(ChunkPool::with_first_chunk(
                config.chunk_size,
                0,
                config.oversize,
            )?),
            GrowthMode::ReserveCommit => {
                Self::Reserve(Reservation::new(provider, config.reserve_size)?)
            }
            GrowthMode::ReserveCommitThenChain => {
                let reservation = Reservation::new(provider, config.reserve_size)?;
                // Fallback chunks are only linked once the reservation runs out.
                let pool = ChunkPool::new(config.chunk_size, reservation.reserved(), config.oversize);
                Self::Hybrid {
                    reservation,
                    pool,
                    spilled: false,
                }
            }
        })
    }

    pub(crate) fn mode(&self) -> GrowthMode {
        match self {
            Self::Fixed(_) => GrowthMode::Fixed,
            Self::Chain(_) => GrowthMode::Chain,
            Self::Reserve(_) => GrowthMode::ReserveCommit,
            Self::Hybrid { .. } => GrowthMode::ReserveCommitThenChain,
        }
    }

    /// Place a request in the memory that is already available.
    pub(crate) fn try_fit(&self, cursor: usize, size: usize, align: usize) -> Option<Placement> {
        match self {
            Self::Fixed(block) => place(block.ptr(), 0, block.len(), cursor, size, align),
            Self::Chain(pool) => pool.try_fit(cursor, size, align),
            Self::Reserve(reservation) => reservation.try_fit(cursor, size, align),
            Self::Hybrid {
                reservation, pool, ..
            } => {
                if cursor >= reservation.reserved() {
                    pool.try_fit(cursor, size, align)
                } else {
                    reservation.try_fit(cursor, size, align)
                }
            }
        }
    }

    /// Obtain room for a request that [`Backing::try_fit`] could not place.
    pub(crate) fn grow(
        &mut self,
        cursor: usize,
        size: usize,
        align: usize,
        metrics: &mut ArenaMetrics,
    ) -> Result<Placement, ArenaError> {
        match self {
            Self::Fixed(block) => Err(ArenaError::CapacityExceeded {
                requested: size,
                capacity: block.len(),
            }),
            Self::Chain(pool) => pool.grow(cursor, size, align, metrics),
            Self::Reserve(reservation) => reservation.grow(cursor, size, align, metrics),
            Self::Hybrid {
                reservation,
                pool,
                spilled,
            } => {
                if !*spilled {
                    // A cursor exactly at the reservation end has nothing
                    // left to commit; it spills like any exhausted request.
                    if cursor < reservation.reserved() {
                        match reservation.grow(cursor, size, align, metrics) {
                            Err(ArenaError::ReservationExhausted { .. }) => {}
                            other => return other,
                        }
                    }
                    *spilled = true;
                    metrics.fallbacks += 1;
                    tracing::debug!(
                        reserved = reservation.reserved(),
                        cursor,
                        requested = size,
                        "reservation exhausted, continuing in heap chunks"
                    );
                }
                pool.grow(cursor, size, align, metrics)
            }
        }
    }

    /// Follow the cursor back to `pos`.
    pub(crate) fn rewind(&mut self, pos: usize, metrics: &mut ArenaMetrics) {
        match self {
            Self::Fixed(_) => {}
            Self::Chain(pool) => pool.rewind(pos),
            Self::Reserve(reservation) => reservation.decommit_above(pos, metrics),
            Self::Hybrid {
                reservation, pool, ..
            } => {
                if pos < reservation.reserved() {
                    reservation.decommit_above(pos, metrics);
                }
                pool.rewind(pos);
            }
        }
    }

    /// Total logical bytes addressable right now.
    pub(crate) fn capacity(&self) -> usize {
        match self {
            Self::Fixed(block) => block.len(),
            Self::Chain(pool) => pool.end(),
            Self::Reserve(reservation) => reservation.reserved(),
            Self::Hybrid { pool, .. } => pool.end(),
        }
    }

    pub(crate) fn committed(&self) -> Option<usize> {
        match self {
            Self::Reserve(reservation) | Self::Hybrid { reservation, .. } => {
                Some(reservation.committed())
            }
            _ => None,
        }
    }

    pub(crate) fn page_size(&self) -> Option<usize> {
        match self {
            Self::Reserve(reservation) | Self::Hybrid { reservation, .. } => {
                Some(reservation.page_size())
            }
            _ => None,
        }
    }

    pub(crate) fn chunks(&self) -> Option<&ChunkPool> {
        match self {
            Self::Chain(pool) | Self::Hybrid { pool, .. } => Some(pool),
            _ => None,
        }
    }

    pub(crate) fn reservation(&self) -> Option<&Reservation<P>> {
        match self {
            Self::Reserve(reservation) | Self::Hybrid { reservation, .. } => Some(reservation),
            _ => None,
        }
    }

    pub(crate) fn has_spilled(&self) -> bool {
        matches!(self, Self::Hybrid { spilled: true, .. })
    }

    /// Heap bytes plus committed bytes.
    pub(crate) fn memory_bytes(&self) -> usize {
        match self {
            Self::Fixed(block) => block.len(),
            Self::Chain(pool) => pool.memory_bytes(),
            Self::Reserve(reservation) => reservation.committed(),
            Self::Hybrid {
                reservation, pool, ..
            } => reservation.committed() + pool.memory_bytes(),
        }
    }

    /// Free everything. Heap memory always goes; an OS refusal to release
    /// the reservation is reported.
    pub(crate) fn release(self) -> Result<(), ArenaError> {
        match self {
            Self::Fixed(_) | Self::Chain(_) => Ok(()),
            Self::Reserve(reservation) => reservation.release(),
            Self::Hybrid {
                reservation, pool, ..
            } => {
                drop(pool);
                reservation.release()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_test_utils::MockPages;

    const PAGE: usize = 4096;

    fn backing(config: ArenaConfig) -> (MockPages, Backing<MockPages>) {
        let mock = MockPages::new(PAGE);
        let b = Backing::new(&config, mock.clone()).unwrap();
        (mock, b)
    }

    #[test]
    fn fixed_cannot_grow() {
        let (_, mut b) = backing(ArenaConfig::fixed(64));
        let mut m = ArenaMetrics::default();
        assert!(b.try_fit(0, 65, 1).is_none());
        let err = b.grow(0, 65, 1, &mut m).err().unwrap();
        assert_eq!(
            err,
            ArenaError::CapacityExceeded {
                requested: 65,
                capacity: 64
            }
        );
    }

    #[test]
    fn chain_grows_by_one_chunk() {
        let (_, mut b) = backing(ArenaConfig::chain(256));
        let mut m = ArenaMetrics::default();
        let placed = b.grow(200, 100, 1, &mut m).unwrap();
        assert_eq!(placed.end, 356);
        assert_eq!(b.chunks().unwrap().count(), 2);
        assert_eq!(b.capacity(), 512);
    }

    #[test]
    fn reserve_commit_grows_committed_prefix() {
        let (mock, mut b) = backing(ArenaConfig::reserve_commit(8 * PAGE));
        let mut m = ArenaMetrics::default();
        b.grow(0, 3 * PAGE, 1, &mut m).unwrap();
        assert_eq!(b.committed(), Some(3 * PAGE));
        assert_eq!(mock.committed_bytes(), 3 * PAGE);
        let err = b.grow(3 * PAGE, 6 * PAGE, 1, &mut m).err().unwrap();
        assert!(matches!(err, ArenaError::ReservationExhausted { .. }));
    }

    #[test]
    fn hybrid_spills_into_chunks_at_reservation_end() {
        let (mock, mut b) = backing(ArenaConfig::reserve_commit_then_chain(2 * PAGE, PAGE));
        let mut m = ArenaMetrics::default();
        let placed = b.grow(PAGE, 2 * PAGE, 1, &mut m).unwrap();
        assert!(b.has_spilled());
        assert_eq!(placed.end, 2 * PAGE + 2 * PAGE);
        assert_eq!(m.fallbacks, 1);
        assert_eq!(mock.stats().commits, 1); // only the bootstrap page
    }

    #[test]
    fn hybrid_never_commits_after_spill() {
        let (mock, mut b) = backing(ArenaConfig::reserve_commit_then_chain(4 * PAGE, PAGE));
        let mut m = ArenaMetrics::default();
        b.grow(0, 5 * PAGE, 1, &mut m).unwrap();
        assert!(b.has_spilled());

        // Back inside the reservation: room beyond the committed page comes
        // from chunks, not from new commits.
        b.rewind(0, &mut m);
        assert!(b.try_fit(0, 2 * PAGE, 1).is_none());
        let placed = b.grow(0, 2 * PAGE, 1, &mut m).unwrap();
        assert!(placed.end > 4 * PAGE);
        assert_eq!(mock.stats().commits, 1);
        assert_eq!(b.committed(), Some(PAGE));
    }

    #[test]
    fn hybrid_spills_when_reservation_is_exactly_full() {
        let (mock, mut b) = backing(ArenaConfig::reserve_commit_then_chain(2 * PAGE, PAGE));
        let mut m = ArenaMetrics::default();
        let full = b.grow(0, 2 * PAGE, 1, &mut m).unwrap();
        assert_eq!(full.end, 2 * PAGE);
        assert!(!b.has_spilled());

        assert!(b.try_fit(2 * PAGE, 16, 1).is_none());
        b.grow(2 * PAGE, 16, 1, &mut m).unwrap();
        assert!(b.has_spilled());
        assert_eq!(m.fallbacks, 1);

        let commits = mock.stats().commits;
        b.rewind(0, &mut m);
        b.grow(0, 2 * PAGE, 1, &mut m).unwrap();
        assert_eq!(mock.stats().commits, commits);
        assert_eq!(m.fallbacks, 1);
    }

    #[test]
    fn hybrid_commit_failure_is_not_a_spill() {
        let (mock, mut b) = backing(ArenaConfig::reserve_commit_then_chain(8 * PAGE, PAGE));
        let mut m = ArenaMetrics::default();
        mock.fail_commits_after(0);
        let err = b.grow(0, 2 * PAGE, 1, &mut m).err().unwrap();
        assert!(matches!(err, ArenaError::CommitFailed(_)));
        assert!(!b.has_spilled());
    }

    #[test]
    fn release_returns_reservation() {
        let (mock, b) = backing(ArenaConfig::reserve_commit_then_chain(4 * PAGE, PAGE));
        assert_eq!(mock.live_reservations(), 1);
        b.release().unwrap();
        assert_eq!(mock.live_reservations(), 0);
    }
}
