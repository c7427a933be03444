//! Heap chunks and the chunk pool used by chained arenas.
//!
//! A [`Chunk`] is one heap buffer occupying a fixed span of the arena's
//! logical address space. A [`ChunkPool`] is the ordered list of chunks;
//! chunk `i + 1` starts at the logical position where chunk `i` ends, so
//! every position maps to exactly one chunk and one offset inside it.
//!
//! Allocations never straddle chunks. When the current chunk cannot hold a
//! request the cursor jumps to the start of the next chunk and the tail of
//! the old one is left unused until a rewind reaches back into it.

use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::config::OversizePolicy;
use crate::error::ArenaError;
use crate::metrics::ArenaMetrics;
use crate::raw::{place, HeapBlock, Placement, BLOCK_ALIGN};

/// A single heap buffer in a chained arena.
///
/// Chunks are never freed individually; the pool drops them all at once.
pub struct Chunk {
    /// Backing storage.
    block: HeapBlock,
    /// Logical position of the first byte.
    base: usize,
}

impl Chunk {
    fn new(size: usize, base: usize) -> Result<Self, ArenaError> {
        Ok(Self {
            block: HeapBlock::new(size)?,
            base,
        })
    }

    /// Logical position of the first byte of this chunk.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Size of the chunk in bytes.
    pub fn size(&self) -> usize {
        self.block.len()
    }

    /// Logical position one past the last byte of this chunk.
    pub fn end(&self) -> usize {
        self.base + self.block.len()
    }

    /// Address of the first byte.
    pub fn data(&self) -> NonNull<u8> {
        self.block.ptr()
    }

    /// Whether `pos` lies inside this chunk or exactly at its end.
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.base && pos <= self.end()
    }

    fn place(&self, cursor: usize, size: usize, align: usize) -> Option<Placement> {
        place(self.block.ptr(), self.base, self.end(), cursor, size, align)
    }
}

/// The ordered chunk list of a chained arena.
///
/// Tracks `first`/`last` (the ends of the list), `current` (the chunk the
/// cursor is in) and `count`. Chunk `0` starts at `origin`: 0 for a purely
/// chained arena, the reservation size for the reserve/commit fallback.
pub struct ChunkPool {
    chunks: SmallVec<[Chunk; 4]>,
    /// Default size of a new chunk.
    chunk_size: usize,
    /// Logical position of chunk 0.
    origin: usize,
    /// Index of the chunk the cursor is in.
    current: usize,
    /// False once an oversized chunk has been linked.
    uniform: bool,
    oversize: OversizePolicy,
}

impl ChunkPool {
    /// Create an empty pool whose first chunk will start at `origin`.
    pub fn new(chunk_size: usize, origin: usize, oversize: OversizePolicy) -> Self {
        Self {
            chunks: SmallVec::new(),
            chunk_size,
            origin,
            current: 0,
            uniform: true,
            oversize,
        }
    }

    /// Create a pool with one chunk already linked.
    pub fn with_first_chunk(
        chunk_size: usize,
        origin: usize,
        oversize: OversizePolicy,
    ) -> Result<Self, ArenaError> {
        let mut pool = Self::new(chunk_size, origin, oversize);
        pool.add_chunk(chunk_size)?;
        Ok(pool)
    }

    /// Append a chunk of `max(chunk_size, requested)` bytes and make it
    /// current. Returns its index.
    pub fn add_chunk(&mut self, requested: usize) -> Result<usize, ArenaError> {
        let size = self.chunk_size.max(requested);
        let chunk = Chunk::new(size, self.end())?;
        if size != self.chunk_size {
            self.uniform = false;
        }
        tracing::debug!(
            index = self.chunks.len(),
            size,
            base = chunk.base(),
            "linked arena chunk"
        );
        self.chunks.push(chunk);
        self.current = self.chunks.len() - 1;
        Ok(self.current)
    }

    /// Map a logical position to `(chunk_index, offset_in_chunk)`.
    ///
    /// A position on the boundary between two chunks resolves to the start
    /// of the later one. The end of the last chunk resolves to that chunk.
    /// Returns `None` for positions outside the pool.
    pub fn locate(&self, pos: usize) -> Option<(usize, usize)> {
        let last = self.chunks.last()?;
        if pos < self.origin || pos > last.end() {
            return None;
        }
        let index = if self.uniform {
            ((pos - self.origin) / self.chunk_size).min(self.chunks.len() - 1)
        } else {
            self.chunks
                .iter()
                .position(|c| pos < c.end())
                .unwrap_or(self.chunks.len() - 1)
        };
        Some((index, pos - self.chunks[index].base))
    }

    /// Place a request in the current chunk without growing.
    pub(crate) fn try_fit(&self, cursor: usize, size: usize, align: usize) -> Option<Placement> {
        if cursor < self.origin {
            return None;
        }
        self.chunks.get(self.current)?.place(cursor, size, align)
    }

    /// Place a request that did not fit at `cursor`.
    ///
    /// Moves onto the next already linked chunk that can hold the request,
    /// or links exactly one new chunk. A request bigger than `chunk_size`
    /// gets a dedicated chunk of its own size, unless the pool rejects
    /// oversized requests.
    pub(crate) fn grow(
        &mut self,
        cursor: usize,
        size: usize,
        align: usize,
        metrics: &mut ArenaMetrics,
    ) -> Result<Placement, ArenaError> {
        let first_candidate = if cursor < self.origin || self.chunks.is_empty() {
            0
        } else {
            self.current + 1
        };
        for index in first_candidate..self.chunks.len() {
            let chunk = &self.chunks[index];
            if let Some(placement) = chunk.place(chunk.base(), size, align) {
                self.current = index;
                metrics.chunk_reuses += 1;
                return Ok(placement);
            }
        }

        if size > self.chunk_size && self.oversize == OversizePolicy::Reject {
            return Err(ArenaError::RequestTooLarge {
                requested: size,
                chunk_size: self.chunk_size,
            });
        }
        // Chunks are BLOCK_ALIGN-aligned; only stricter alignments need slack.
        let slack = if align > BLOCK_ALIGN { align - 1 } else { 0 };
        let needed = size
            .checked_add(slack)
            .ok_or(ArenaError::OutOfMemory { requested: size })?;

        let index = self.add_chunk(needed)?;
        metrics.chunks_linked += 1;
        let chunk = &self.chunks[index];
        chunk
            .place(chunk.base(), size, align)
            .ok_or(ArenaError::CapacityExceeded {
                requested: size,
                capacity: chunk.size(),
            })
    }

    /// Make the chunk containing `pos` current. Positions before the pool's
    /// origin leave it untouched.
    pub(crate) fn rewind(&mut self, pos: usize) {
        if let Some((index, _)) = self.locate(pos) {
            self.current = index;
        }
    }

    /// Number of linked chunks.
    pub fn count(&self) -> usize {
        self.chunks.len()
    }

    /// The first chunk, if any.
    pub fn first(&self) -> Option<&Chunk> {
        self.chunks.first()
    }

    /// The most recently linked chunk, if any.
    pub fn last(&self) -> Option<&Chunk> {
        self.chunks.last()
    }

    /// The chunk the cursor is in, if any.
    pub fn current(&self) -> Option<&Chunk> {
        self.chunks.get(self.current)
    }

    /// Index of the current chunk.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Chunk by index.
    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Default chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Logical position of the first chunk.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Logical position one past the last chunk (the origin when empty).
    pub fn end(&self) -> usize {
        self.chunks.last().map_or(self.origin, Chunk::end)
    }

    /// Whether every chunk has the default size.
    pub fn is_uniform(&self) -> bool {
        self.uniform
    }

    /// Total heap bytes held by the pool.
    pub fn memory_bytes(&self) -> usize {
        self.chunks.iter().map(Chunk::size).sum()
    }
}
