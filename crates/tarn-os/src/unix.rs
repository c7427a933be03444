//! POSIX backend: `mmap`, `mprotect`, `madvise`, `munmap`.

use std::io;
use std::ptr::{self, NonNull};

use libc::{c_void, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_NONE, PROT_READ, PROT_WRITE};
use tarn_core::{PageError, PageOp};

#[cfg(any(target_os = "linux", target_os = "android"))]
const RESERVE_FLAGS: libc::c_int = MAP_PRIVATE | MAP_ANONYMOUS | libc::MAP_NORESERVE;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const RESERVE_FLAGS: libc::c_int = MAP_PRIVATE | MAP_ANONYMOUS;

fn last_error(op: PageOp, addr: usize, size: usize) -> PageError {
    PageError::new(op, addr, size, io::Error::last_os_error().raw_os_error())
}

pub(crate) fn query_page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size < 1 {
        panic!("unsupported page size {size}");
    }
    size as usize
}

pub(crate) fn reserve(size: usize) -> Result<NonNull<u8>, PageError> {
    // SAFETY: anonymous mapping at a kernel-chosen address; no existing
    // memory is affected.
    let p = unsafe { libc::mmap(ptr::null_mut(), size, PROT_NONE, RESERVE_FLAGS, -1, 0) };
    if p == MAP_FAILED {
        return Err(last_error(PageOp::Reserve, 0, size));
    }
    NonNull::new(p.cast::<u8>()).ok_or_else(|| PageError::new(PageOp::Reserve, 0, size, None))
}

/// # Safety
///
/// `[addr, addr + size)` is page-aligned and inside a live reservation.
pub(crate) unsafe fn commit(addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
    // SAFETY: caller guarantees the range belongs to one of our mappings.
    let rc = unsafe { libc::mprotect(addr.as_ptr().cast::<c_void>(), size, PROT_READ | PROT_WRITE) };
    if rc != 0 {
        return Err(last_error(PageOp::Commit, addr.as_ptr() as usize, size));
    }
    Ok(())
}

/// # Safety
///
/// As for [`commit`]; the contents of the range are discarded.
pub(crate) unsafe fn decommit(addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
    let raw = addr.as_ptr().cast::<c_void>();
    // SAFETY: caller guarantees the range belongs to one of our mappings
    // and that nothing borrows it.
    let rc = unsafe { libc::madvise(raw, size, libc::MADV_DONTNEED) };
    if rc != 0 {
        return Err(last_error(PageOp::Decommit, addr.as_ptr() as usize, size));
    }
    // Match Windows: decommitted pages fault on access until recommitted.
    // SAFETY: same range as above.
    let rc = unsafe { libc::mprotect(raw, size, PROT_NONE) };
    if rc != 0 {
        return Err(last_error(PageOp::Decommit, addr.as_ptr() as usize, size));
    }
    Ok(())
}

/// # Safety
///
/// `addr`/`size` describe a whole reservation that is no longer used.
pub(crate) unsafe fn release(addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
    // SAFETY: caller hands over the whole mapping.
    let rc = unsafe { libc::munmap(addr.as_ptr().cast::<c_void>(), size) };
    if rc != 0 {
        return Err(last_error(PageOp::Release, addr.as_ptr() as usize, size));
    }
    Ok(())
}
