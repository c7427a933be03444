//! Benchmark profiles and utilities for the Tarn arena allocator.
//!
//! Provides pre-built arena configurations and request streams for
//! benchmarks and examples:
//!
//! - [`bench_config`]: one configuration per growth mode, sized alike
//! - [`request_stream`]: deterministic mixed-size requests via seed
//! - [`replay`]: push a request stream into an arena

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tarn_arena::{Arena, ArenaConfig, GrowthMode, PageProvider};

/// Chunk size used by the chained profiles.
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Reservation size used by the reserve/commit profiles.
pub const RESERVE_SIZE: usize = 256 * 1024 * 1024;

/// Build the benchmark configuration for `mode`.
///
/// Fixed arenas get the full reservation size up front so that no profile
/// runs out before the others.
pub fn bench_config(mode: GrowthMode) -> ArenaConfig {
    match mode {
        GrowthMode::Fixed => ArenaConfig::fixed(RESERVE_SIZE),
        GrowthMode::Chain => ArenaConfig::chain(CHUNK_SIZE),
        GrowthMode::ReserveCommit => ArenaConfig::reserve_commit(RESERVE_SIZE),
        GrowthMode::ReserveCommitThenChain => {
            ArenaConfig::reserve_commit_then_chain(RESERVE_SIZE / 4, CHUNK_SIZE)
        }
    }
}

/// A single `(size, align)` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request {
    pub size: usize,
    pub align: usize,
}

/// Generate `n` requests of mostly small, occasionally large sizes.
///
/// Roughly one request in 64 is between 4 KiB and 64 KiB; the rest are
/// under 256 bytes. Alignments range over 1 to 64. Identical seeds give
/// identical streams.
pub fn request_stream(seed: u64, n: usize) -> Vec<Request> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let bits = rng.next_u64();
            let size = if bits % 64 == 0 {
                4096 + (bits >> 8) as usize % (60 * 1024)
            } else {
                (bits >> 8) as usize % 256
            };
            let align = 1usize << ((bits >> 40) % 7);
            Request { size, align }
        })
        .collect()
}

/// Push every request into `arena` and return the total padded bytes used.
pub fn replay<P: PageProvider>(arena: &mut Arena<P>, requests: &[Request]) -> usize {
    let start = arena.pos();
    for r in requests {
        arena.push(r.size, r.align, false);
    }
    arena.pos().get() - start.get()
}
