//! The virtual-memory capability consumed by reserve/commit arenas.
//!
//! [`PageProvider`] is the seam between the arena and the operating system.
//! The arena never branches on platform; it only calls these five
//! operations. `tarn-os` supplies the implementation for the build target
//! and `tarn-test-utils` supplies an in-process mock.

use std::error::Error;
use std::fmt;
use std::ptr::NonNull;

/// Which provider operation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageOp {
    /// Reserving address space.
    Reserve,
    /// Backing reserved pages with memory.
    Commit,
    /// Dropping the backing of committed pages.
    Decommit,
    /// Tearing down a reservation.
    Release,
}

impl fmt::Display for PageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reserve => "reserve",
            Self::Commit => "commit",
            Self::Decommit => "decommit",
            Self::Release => "release",
        };
        f.write_str(name)
    }
}

/// A failed virtual-memory operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageError {
    /// The operation that failed.
    pub op: PageOp,
    /// Start address of the affected range (0 for a failed reserve).
    pub addr: usize,
    /// Length of the affected range in bytes.
    pub size: usize,
    /// Raw OS error code, when the platform reported one.
    pub os_code: Option<i32>,
}

impl PageError {
    /// Build an error for `op` over `[addr, addr + size)`.
    pub fn new(op: PageOp, addr: usize, size: usize, os_code: Option<i32>) -> Self {
        Self {
            op,
            addr,
            size,
            os_code,
        }
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} bytes at {:#x} failed",
            self.op, self.size, self.addr
        )?;
        if let Some(code) = self.os_code {
            write!(f, " (os error {code})")?;
        }
        Ok(())
    }
}

impl Error for PageError {}

/// Reserve/commit/decommit/release over page-granular address ranges.
///
/// Sizes and addresses passed to `commit`, `decommit` and `release` must be
/// multiples of [`PageProvider::page_size`] and lie inside a range returned
/// by [`PageProvider::reserve`]. Committing an already committed page and
/// decommitting an already decommitted page are both allowed.
#[allow(unsafe_code)]
pub trait PageProvider {
    /// Page granularity in bytes. Always a power of two.
    fn page_size(&self) -> usize;

    /// Reserve `size` bytes of address space with no backing and no access.
    fn reserve(&self, size: usize) -> Result<NonNull<u8>, PageError>;

    /// Back `[addr, addr + size)` with read/write memory.
    ///
    /// # Safety
    ///
    /// The range must be page-aligned and lie within a live reservation
    /// obtained from this provider.
    unsafe fn commit(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError>;

    /// Drop the backing of `[addr, addr + size)`, keeping the address space.
    ///
    /// # Safety
    ///
    /// As for [`PageProvider::commit`]. No live reference may point into
    /// the range: its contents are discarded.
    unsafe fn decommit(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError>;

    /// Tear down a whole reservation.
    ///
    /// # Safety
    ///
    /// `addr` and `size` must be exactly those of a reservation from this
    /// provider, and the reservation must not be used afterwards.
    unsafe fn release(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError>;
}
