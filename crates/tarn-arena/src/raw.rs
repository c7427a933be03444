//! Low-level primitives for arena memory operations.
//!
//! Everything that touches raw heap memory lives here: [`HeapBlock`], the
//! owning handle for fixed buffers and chunks, and [`place`], the single
//! bump-placement routine every backing uses to turn a cursor into an
//! aligned address.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use tarn_core::align_up;

use crate::error::ArenaError;

/// Alignment of every heap block.
///
/// Requests aligned to at most this many bytes land at the same offset
/// from the start of a block regardless of which block serves them.
pub(crate) const BLOCK_ALIGN: usize = 4096;

/// An owned, uninitialised heap buffer aligned to [`BLOCK_ALIGN`].
pub(crate) struct HeapBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl HeapBlock {
    /// Allocate `size` bytes. `size` must be non-zero.
    pub(crate) fn new(size: usize) -> Result<Self, ArenaError> {
        debug_assert!(size > 0, "heap blocks are never empty");
        let layout = Layout::from_size_align(size, BLOCK_ALIGN)
            .map_err(|_| ArenaError::OutOfMemory { requested: size })?;
        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(ArenaError::OutOfMemory { requested: size })?;
        Ok(Self { ptr, layout })
    }

    pub(crate) fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    pub(crate) fn len(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for HeapBlock {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `alloc::alloc` with exactly this layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

// SAFETY: the block is uniquely owned; moving it to another thread moves
// sole ownership of the allocation.
unsafe impl Send for HeapBlock {}

/// Where a bump allocation landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Placement {
    /// Aligned start of the allocation.
    pub(crate) ptr: NonNull<u8>,
    /// Cursor value after the allocation.
    pub(crate) end: usize,
}

/// Bump-place `size` bytes aligned to `align` at logical position `cursor`
/// inside a region whose first byte is at `base` and has logical position
/// `origin`. The region ends at logical position `limit`.
///
/// Padding is computed from the real address, so any power-of-two
/// alignment is honoured. Returns `None` when the padded request does not
/// fit or the arithmetic would overflow.
pub(crate) fn place(
    base: NonNull<u8>,
    origin: usize,
    limit: usize,
    cursor: usize,
    size: usize,
    align: usize,
) -> Option<Placement> {
    let offset = cursor.checked_sub(origin)?;
    let addr = (base.as_ptr() as usize).checked_add(offset)?;
    let pad = align_up(addr, align)? - addr;
    let start = cursor.checked_add(pad)?;
    let end = start.checked_add(size)?;
    if end > limit {
        return None;
    }
    // SAFETY: `start - origin <= end - origin <= limit - origin`, which is
    // the length of the region, so the result is in bounds or one past it.
    let ptr = unsafe { base.add(start - origin) };
    Some(Placement { ptr, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_block_is_block_aligned() {
        let block = HeapBlock::new(100).unwrap();
        assert_eq!(block.len(), 100);
        assert_eq!(block.ptr().as_ptr() as usize % BLOCK_ALIGN, 0);
    }

    #[test]
    fn place_pads_to_alignment() {
        let block = HeapBlock::new(256).unwrap();
        let p = place(block.ptr(), 0, 256, 3, 8, 8).unwrap();
        assert_eq!(p.ptr.as_ptr() as usize - block.ptr().as_ptr() as usize, 8);
        assert_eq!(p.end, 16);
    }

    #[test]
    fn place_respects_origin() {
        let block = HeapBlock::new(64).unwrap();
        // Region covering logical positions [1000, 1064).
        let p = place(block.ptr(), 1000, 1064, 1010, 4, 4).unwrap();
        assert_eq!(p.end, 1016);
        assert_eq!(p.ptr.as_ptr() as usize - block.ptr().as_ptr() as usize, 12);
        assert!(place(block.ptr(), 1000, 1064, 999, 1, 1).is_none());
    }

    #[test]
    fn place_rejects_overflowing_region() {
        let block = HeapBlock::new(64).unwrap();
        assert!(place(block.ptr(), 0, 64, 60, 8, 1).is_none());
        assert!(place(block.ptr(), 0, 64, 56, 8, 1).is_some());
        assert!(place(block.ptr(), 0, 64, 0, usize::MAX, 1).is_none());
    }

    #[test]
    fn zero_size_place_only_aligns() {
        let block = HeapBlock::new(64).unwrap();
        let p = place(block.ptr(), 0, 64, 5, 0, 16).unwrap();
        assert_eq!(p.end, 16);
    }
}
