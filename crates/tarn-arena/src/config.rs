//! Arena configuration parameters.

use tarn_core::GrowthMode;

use crate::error::ArenaError;

/// What a chained arena does with a request larger than one chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OversizePolicy {
    /// Link a dedicated chunk sized to fit the request.
    #[default]
    DedicatedChunk,
    /// Treat the request as a contract violation.
    ///
    /// Only the requested size is compared with the chunk size. Alignment
    /// padding never causes a rejection; a chunk grown to hold strict
    /// alignment slack may exceed the configured chunk size.
    Reject,
}

/// Configuration for an arena.
///
/// Only the fields relevant to `mode` are consulted: `capacity` for
/// [`GrowthMode::Fixed`], `chunk_size` for the chunked modes and
/// `reserve_size` for the reserve/commit modes. Validated at construction;
/// immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Growth policy.
    pub mode: GrowthMode,

    /// Size of the single buffer of a fixed arena, in bytes.
    ///
    /// Default: 2 MiB.
    pub capacity: usize,

    /// Size of each heap chunk, in bytes.
    ///
    /// Default: 2 MiB. Chunks larger than this are only linked for
    /// oversized requests under [`OversizePolicy::DedicatedChunk`].
    pub chunk_size: usize,

    /// Size of the virtual reservation, in bytes. Rounded up to whole pages.
    ///
    /// Default: 64 GiB on 64-bit targets. Only address space is consumed until pages are
    /// committed.
    pub reserve_size: usize,

    /// Handling of single requests larger than `chunk_size`.
    pub oversize: OversizePolicy,

    /// Alignment used by the size-only allocation calls (`alloc`,
    /// `alloc_no_zero`). Must be a power of two.
    ///
    /// Default: 8.
    pub auto_align: usize,
}

impl ArenaConfig {
    /// Default fixed capacity: 2 MiB.
    pub const DEFAULT_CAPACITY: usize = 2 * 1024 * 1024;

    /// Default chunk size: 2 MiB.
    pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

    /// Default reservation: 64 GiB.
    #[cfg(target_pointer_width = "64")]
    pub const DEFAULT_RESERVE_SIZE: usize = 64 * 1024 * 1024 * 1024;

    /// Default reservation: 1 GiB on targets without a 64-bit address space.
    #[cfg(not(target_pointer_width = "64"))]
    pub const DEFAULT_RESERVE_SIZE: usize = 1024 * 1024 * 1024;

    /// Default alignment for size-only allocations.
    pub const DEFAULT_AUTO_ALIGN: usize = 8;

    fn with_mode(mode: GrowthMode) -> Self {
        Self {
            mode,
            capacity: Self::DEFAULT_CAPACITY,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            reserve_size: Self::DEFAULT_RESERVE_SIZE,
            oversize: OversizePolicy::default(),
            auto_align: Self::DEFAULT_AUTO_ALIGN,
        }
    }

    /// A non-growing arena over one buffer of `capacity` bytes.
    pub fn fixed(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::with_mode(GrowthMode::Fixed)
        }
    }

    /// A chunk-chaining arena with chunks of `chunk_size` bytes.
    pub fn chain(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::with_mode(GrowthMode::Chain)
        }
    }

    /// A reserve/commit arena over `reserve_size` bytes of address space.
    pub fn reserve_commit(reserve_size: usize) -> Self {
        Self {
            reserve_size,
            ..Self::with_mode(GrowthMode::ReserveCommit)
        }
    }

    /// A reserve/commit arena that continues in `chunk_size` heap chunks
    /// once `reserve_size` is exhausted.
    pub fn reserve_commit_then_chain(reserve_size: usize, chunk_size: usize) -> Self {
        Self {
            reserve_size,
            chunk_size,
            ..Self::with_mode(GrowthMode::ReserveCommitThenChain)
        }
    }

    /// Set the oversized-request policy.
    pub fn with_oversize(mut self, oversize: OversizePolicy) -> Self {
        self.oversize = oversize;
        self
    }

    /// Set the alignment used by size-only allocations.
    pub fn with_auto_align(mut self, align: usize) -> Self {
        self.auto_align = align;
        self
    }

    /// Check that every parameter the mode consults is usable.
    pub fn validate(&self) -> Result<(), ArenaError> {
        let invalid = |reason: String| Err(ArenaError::InvalidConfig { reason });

        if !self.auto_align.is_power_of_two() {
            return invalid(format!(
                "auto_align must be a power of two (got {})",
                self.auto_align
            ));
        }
        if self.mode == GrowthMode::Fixed && self.capacity == 0 {
            return invalid("capacity must be > 0 for a fixed arena".into());
        }
        if self.mode.uses_chunks() && self.chunk_size == 0 {
            return invalid(format!("chunk_size must be > 0 for a {} arena", self.mode));
        }
        if self.mode.uses_reservation() && self.reserve_size == 0 {
            return invalid(format!("reserve_size must be > 0 for a {} arena", self.mode));
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::chain(Self::DEFAULT_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_2mb_chain() {
        let config = ArenaConfig::default();
        assert_eq!(config.mode, GrowthMode::Chain);
        assert_eq!(config.chunk_size, 2 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn constructors_set_mode_and_size() {
        let fixed = ArenaConfig::fixed(4096);
        assert_eq!(fixed.mode, GrowthMode::Fixed);
        assert_eq!(fixed.capacity, 4096);

        let hybrid = ArenaConfig::reserve_commit_then_chain(1 << 20, 1 << 16);
        assert_eq!(hybrid.mode, GrowthMode::ReserveCommitThenChain);
        assert_eq!(hybrid.reserve_size, 1 << 20);
        assert_eq!(hybrid.chunk_size, 1 << 16);
    }

    #[test]
    fn zero_sizes_rejected_per_mode() {
        assert!(ArenaConfig::fixed(0).validate().is_err());
        assert!(ArenaConfig::chain(0).validate().is_err());
        assert!(ArenaConfig::reserve_commit(0).validate().is_err());
        assert!(ArenaConfig::reserve_commit_then_chain(1 << 20, 0)
            .validate()
            .is_err());
        assert!(ArenaConfig::reserve_commit_then_chain(0, 1 << 16)
            .validate()
            .is_err());
    }

    #[test]
    fn irrelevant_fields_are_not_checked() {
        let config = ArenaConfig {
            chunk_size: 0,
            reserve_size: 0,
            ..ArenaConfig::fixed(64)
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn auto_align_must_be_power_of_two() {
        let err = ArenaConfig::chain(1024).with_auto_align(12).validate();
        assert!(matches!(err, Err(ArenaError::InvalidConfig { .. })));
        assert!(ArenaConfig::chain(1024).with_auto_align(16).validate().is_ok());
    }
}
