//! The arena: bump allocation, rewind, clear and release.
//!
//! [`Arena`] is the type every consumer uses. It owns a cursor and a
//! mode-tagged backing store; each push places the request at
//! the cursor if the current backing has room and otherwise hands it to the
//! growth policy engine.
//!
//! # Fatal allocation
//!
//! Arenas are sized by their owner, so running out is a bug in the caller,
//! not a condition to recover from mid-operation. [`Arena::push`] and the
//! calls built on it panic when growth is impossible. The `try_*` variants
//! return the same failure as an [`ArenaError`] and leave the arena
//! untouched.
//!
//! # Pointer validity
//!
//! Pushes return raw pointers. A pointer stays valid until the arena is
//! rewound to a position at or below the start of its allocation, or the
//! arena is released. The arena never runs destructors for values placed
//! in it.

use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use tarn_core::{ArenaPos, GrowthMode, PageProvider};
use tarn_os::SystemPages;

use crate::chunk::ChunkPool;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::growth::Backing;
use crate::metrics::ArenaMetrics;
use crate::reservation::Reservation;
use crate::scope::ArenaScope;

/// A bump allocator over one of four growth policies.
///
/// Positions are byte offsets from the arena's logical base, which is 0 in
/// every mode: the control block is an ordinary heap value and does not
/// occupy the start of the reservation.
pub struct Arena<P: PageProvider = SystemPages> {
    backing: Backing<P>,
    /// Next free logical byte.
    cursor: usize,
    auto_align: usize,
    config: ArenaConfig,
    metrics: ArenaMetrics,
}

impl Arena<SystemPages> {
    /// Create an arena backed by the operating system's virtual memory.
    ///
    /// Fails if the configuration is invalid, or if the initial buffer,
    /// chunk, reservation or bootstrap commit cannot be obtained.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        Self::with_provider(config, SystemPages::new())
    }
}

impl<P: PageProvider> Arena<P> {
    /// Create an arena whose reservation (if its mode uses one) comes from
    /// `provider`.
    pub fn with_provider(config: ArenaConfig, provider: P) -> Result<Self, ArenaError> {
        config.validate()?;
        let backing = Backing::new(&config, provider)?;
        tracing::debug!(mode = %config.mode, capacity = backing.capacity(), "created arena");
        Ok(Self {
            backing,
            cursor: 0,
            auto_align: config.auto_align,
            config,
            metrics: ArenaMetrics::default(),
        })
    }

    /// The current cursor. Pass it to [`Arena::pop_to`] to rewind here.
    #[inline]
    pub fn pos(&self) -> ArenaPos {
        ArenaPos(self.cursor)
    }

    /// Allocate `size` bytes aligned to `align`, optionally zero-filled.
    ///
    /// Returns the aligned start of the allocation, or the reason no room
    /// could be made. On error the arena is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    pub fn try_push(
        &mut self,
        size: usize,
        align: usize,
        zero: bool,
    ) -> Result<NonNull<u8>, ArenaError> {
        assert!(
            align.is_power_of_two(),
            "alignment {align} is not a power of two"
        );
        let placement = match self.backing.try_fit(self.cursor, size, align) {
            Some(placement) => placement,
            None => self
                .backing
                .grow(self.cursor, size, align, &mut self.metrics)?,
        };
        if zero {
            // SAFETY: the placement covers `size` writable bytes.
            unsafe { ptr::write_bytes(placement.ptr.as_ptr(), 0, size) };
        }
        self.cursor = placement.end;
        self.metrics.record_push(placement.end);
        Ok(placement.ptr)
    }

    /// Allocate `size` bytes aligned to `align`, optionally zero-filled.
    ///
    /// # Panics
    ///
    /// Panics if the arena cannot grow to fit the request (fixed capacity
    /// exhausted, reservation and fallback exhausted, OS commit refused,
    /// oversized request under [`OversizePolicy::Reject`](crate::OversizePolicy::Reject)),
    /// or if `align` is not a power of two.
    pub fn push(&mut self, size: usize, align: usize, zero: bool) -> NonNull<u8> {
        match self.try_push(size, align, zero) {
            Ok(ptr) => ptr,
            Err(e) => self.fatal(e),
        }
    }

    /// [`Arena::push`] without zero-filling.
    pub fn push_no_zero(&mut self, size: usize, align: usize) -> NonNull<u8> {
        self.push(size, align, false)
    }

    /// Advance the cursor to the next multiple of `align` without
    /// allocating.
    pub fn try_push_aligner(&mut self, align: usize) -> Result<NonNull<u8>, ArenaError> {
        self.try_push(0, align, false)
    }

    /// Advance the cursor to the next multiple of `align` without
    /// allocating. Fatal like [`Arena::push`].
    pub fn push_aligner(&mut self, align: usize) -> NonNull<u8> {
        self.push(0, align, false)
    }

    /// Allocate `size` zeroed bytes at the arena's auto-alignment.
    pub fn alloc(&mut self, size: usize) -> NonNull<u8> {
        self.push(size, self.auto_align, true)
    }

    /// Allocate `size` bytes at the arena's auto-alignment, leaving them
    /// uninitialised.
    pub fn alloc_no_zero(&mut self, size: usize) -> NonNull<u8> {
        self.push(size, self.auto_align, false)
    }

    /// Allocate zeroed room for `count` values of `T`.
    ///
    /// All-zero bytes are not a valid `T` for every type; the caller decides
    /// whether to read before writing.
    pub fn push_array<T>(&mut self, count: usize) -> NonNull<T> {
        let size = self.array_size::<T>(count);
        self.push(size, mem::align_of::<T>(), true).cast()
    }

    /// Allocate uninitialised room for `count` values of `T`.
    pub fn push_array_no_zero<T>(&mut self, count: usize) -> NonNull<T> {
        let size = self.array_size::<T>(count);
        self.push(size, mem::align_of::<T>(), false).cast()
    }

    /// Move `value` into the arena. Its destructor will never run.
    pub fn push_value<T>(&mut self, value: T) -> NonNull<T> {
        let ptr = self
            .push(mem::size_of::<T>(), mem::align_of::<T>(), false)
            .cast::<T>();
        // SAFETY: freshly allocated, correctly sized and aligned for `T`.
        unsafe { ptr.as_ptr().write(value) };
        ptr
    }

    fn array_size<T>(&self, count: usize) -> usize {
        match mem::size_of::<T>().checked_mul(count) {
            Some(size) => size,
            None => self.fatal(ArenaError::SizeOverflow {
                count,
                elem_size: mem::size_of::<T>(),
            }),
        }
    }

    /// Rewind the cursor to `pos`, invalidating everything allocated at or
    /// after it.
    ///
    /// Reserve/commit arenas also decommit whole pages past `pos`; if the
    /// OS refuses, the failure is logged and counted in
    /// [`ArenaMetrics::decommit_failures`] and the rewind still happens.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is beyond the current cursor.
    pub fn pop_to(&mut self, pos: ArenaPos) {
        let pos = pos.get();
        assert!(
            pos <= self.cursor,
            "cannot rewind forward: target {pos} is beyond the cursor at {}",
            self.cursor
        );
        self.backing.rewind(pos, &mut self.metrics);
        self.cursor = pos;
        self.metrics.rewinds += 1;
    }

    /// Rewind the cursor by `size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size` exceeds [`Arena::pos`].
    pub fn pop(&mut self, size: usize) {
        let Some(target) = self.cursor.checked_sub(size) else {
            panic!(
                "cannot pop {size} bytes from an arena positioned at {}",
                self.cursor
            );
        };
        self.pop_to(ArenaPos(target));
    }

    /// Rewind to the arena's base, keeping its chunks for reuse.
    pub fn clear(&mut self) {
        self.pop_to(ArenaPos::ZERO);
    }

    /// Free every chunk, buffer and reservation the arena owns.
    ///
    /// Dropping an arena does the same but can only log a refused release.
    pub fn release(self) -> Result<(), ArenaError> {
        tracing::debug!(mode = %self.mode(), high_water = self.metrics.high_water, "releasing arena");
        self.backing.release()
    }

    /// Record the pos now and rewind to it when the returned guard drops.
    pub fn scope(&mut self) -> ArenaScope<'_, P> {
        ArenaScope::new(self)
    }

    /// Alignment used by [`Arena::alloc`] and [`Arena::alloc_no_zero`].
    pub fn auto_align(&self) -> usize {
        self.auto_align
    }

    /// Change the alignment used by [`Arena::alloc`] and
    /// [`Arena::alloc_no_zero`].
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    pub fn set_auto_align(&mut self, align: usize) {
        assert!(
            align.is_power_of_two(),
            "alignment {align} is not a power of two"
        );
        self.auto_align = align;
    }

    /// The growth policy this arena was created with.
    pub fn mode(&self) -> GrowthMode {
        self.backing.mode()
    }

    /// The configuration this arena was created with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Logical bytes addressable without further growth: the fixed buffer,
    /// the reservation, or the end of the last linked chunk.
    pub fn capacity(&self) -> usize {
        self.backing.capacity()
    }

    /// Committed bytes of the reservation, for reserve/commit modes.
    pub fn committed(&self) -> Option<usize> {
        self.backing.committed()
    }

    /// Page size of the reservation, for reserve/commit modes.
    pub fn page_size(&self) -> Option<usize> {
        self.backing.page_size()
    }

    /// Number of linked heap chunks (0 for modes without chunks).
    pub fn chunk_count(&self) -> usize {
        self.backing.chunks().map_or(0, ChunkPool::count)
    }

    /// The chunk pool, for modes that chain chunks.
    pub fn chunks(&self) -> Option<&ChunkPool> {
        self.backing.chunks()
    }

    /// The reservation, for reserve/commit modes.
    pub fn reservation(&self) -> Option<&Reservation<P>> {
        self.backing.reservation()
    }

    /// Whether a reserve/commit-then-chain arena has switched to chunks.
    pub fn has_spilled(&self) -> bool {
        self.backing.has_spilled()
    }

    /// Heap bytes plus committed bytes currently held.
    pub fn memory_bytes(&self) -> usize {
        self.backing.memory_bytes()
    }

    /// Allocation counters.
    pub fn metrics(&self) -> &ArenaMetrics {
        &self.metrics
    }

    #[cold]
    #[track_caller]
    fn fatal(&self, err: ArenaError) -> ! {
        tracing::error!(
            mode = %self.mode(),
            pos = self.cursor,
            capacity = self.capacity(),
            error = %err,
            "arena allocation failed"
        );
        panic!("arena allocation failed: {err}");
    }
}

impl<P: PageProvider> fmt::Debug for Arena<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("mode", &self.mode())
            .field("pos", &self.cursor)
            .field("capacity", &self.capacity())
            .field("committed", &self.committed())
            .field("chunks", &self.chunk_count())
            .field("spilled", &self.has_spilled())
            .finish()
    }
}
