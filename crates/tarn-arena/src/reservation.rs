//! A virtual address reservation committed on demand.
//!
//! [`Reservation`] owns one range of address space obtained from a
//! [`PageProvider`]. The first `committed` bytes are backed by memory; the
//! rest is address space only. Logical position `p` in the arena is byte
//! `p` of the reservation.

use std::ptr::NonNull;

use tarn_core::{align_up, PageError, PageProvider};

use crate::error::ArenaError;
use crate::metrics::ArenaMetrics;
use crate::raw::{place, Placement};

/// A reserved address range with a committed prefix.
///
/// Invariants: `committed` is a multiple of `page_size`, at least one page,
/// and never more than `reserved`.
pub struct Reservation<P: PageProvider> {
    provider: P,
    base: NonNull<u8>,
    reserved: usize,
    committed: usize,
    page_size: usize,
    live: bool,
}

impl<P: PageProvider> Reservation<P> {
    /// Reserve at least `size` bytes and commit the first page.
    ///
    /// On failure nothing stays reserved.
    pub fn new(provider: P, size: usize) -> Result<Self, ArenaError> {
        let page_size = provider.page_size();
        let reserved = align_up(size.max(page_size), page_size).ok_or_else(|| {
            ArenaError::InvalidConfig {
                reason: format!("reserve_size {size} overflows when rounded to whole pages"),
            }
        })?;

        let base = provider.reserve(reserved).map_err(ArenaError::ReserveFailed)?;

        // SAFETY: the first page of a reservation we just made.
        if let Err(e) = unsafe { provider.commit(base, page_size) } {
            // SAFETY: releasing the reservation we just made; nothing uses it.
            if let Err(release_err) = unsafe { provider.release(base, reserved) } {
                tracing::warn!(error = %release_err, "failed to release reservation after commit failure");
            }
            return Err(ArenaError::CommitFailed(e));
        }

        tracing::debug!(reserved, page_size, "reserved arena address space");
        Ok(Self {
            provider,
            base,
            reserved,
            committed: page_size,
            page_size,
            live: true,
        })
    }

    /// Place a request inside the committed prefix without committing.
    pub(crate) fn try_fit(&self, cursor: usize, size: usize, align: usize) -> Option<Placement> {
        place(self.base, 0, self.committed, cursor, size, align)
    }

    /// Place a request that did not fit the committed prefix, committing
    /// pages up to the page-aligned end of the allocation.
    pub(crate) fn grow(
        &mut self,
        cursor: usize,
        size: usize,
        align: usize,
        metrics: &mut ArenaMetrics,
    ) -> Result<Placement, ArenaError> {
        let placement = place(self.base, 0, self.reserved, cursor, size, align).ok_or(
            ArenaError::ReservationExhausted {
                requested: size,
                reserved: self.reserved,
            },
        )?;

        // `reserved` is page-aligned, so the ceiling stays inside it.
        let target = align_up(placement.end, self.page_size).unwrap_or(self.reserved);
        if target > self.committed {
            let len = target - self.committed;
            // SAFETY: `[committed, target)` is page-aligned and inside the
            // reservation.
            unsafe {
                let start = self.base.add(self.committed);
                self.provider
                    .commit(start, len)
                    .map_err(ArenaError::CommitFailed)?;
            }
            tracing::trace!(from = self.committed, to = target, "committed arena pages");
            self.committed = target;
            metrics.commits += 1;
        }
        Ok(placement)
    }

    /// Decommit every page strictly beyond the page-aligned ceiling of
    /// `pos`. The first page always stays committed.
    ///
    /// A refused decommit is logged and counted; the pages stay committed
    /// and the arena carries on.
    pub(crate) fn decommit_above(&mut self, pos: usize, metrics: &mut ArenaMetrics) {
        let ceiling = align_up(pos, self.page_size)
            .unwrap_or(self.reserved)
            .clamp(self.page_size, self.reserved);
        if ceiling >= self.committed {
            return;
        }
        let len = self.committed - ceiling;
        // SAFETY: `[ceiling, committed)` is page-aligned, committed, and
        // holds nothing below the new cursor.
        let result = unsafe { self.provider.decommit(self.base.add(ceiling), len) };
        match result {
            Ok(()) => {
                tracing::trace!(from = self.committed, to = ceiling, "decommitted arena pages");
                self.committed = ceiling;
                metrics.decommits += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, committed = self.committed, "decommit failed; pages stay committed");
                metrics.decommit_failures += 1;
            }
        }
    }

    /// Release the whole reservation, reporting OS failure.
    pub fn release(mut self) -> Result<(), ArenaError> {
        self.release_pages().map_err(ArenaError::ReleaseFailed)
    }

    fn release_pages(&mut self) -> Result<(), PageError> {
        if !self.live {
            return Ok(());
        }
        self.live = false;
        // SAFETY: base/reserved are exactly the reservation made in `new`,
        // and `live` guarantees it is released once.
        unsafe { self.provider.release(self.base, self.reserved) }
    }

    /// Address of the first reserved byte.
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Size of the reservation in bytes.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Bytes currently backed by memory.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Page size the reservation was made with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The provider backing this reservation.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: PageProvider> Drop for Reservation<P> {
    fn drop(&mut self) {
        if let Err(e) = self.release_pages() {
            tracing::warn!(error = %e, "failed to release arena reservation");
        }
    }
}

// SAFETY: the reservation is uniquely owned; moving it moves sole
// ownership of the address range along with the provider.
unsafe impl<P: PageProvider + Send> Send for Reservation<P> {}
