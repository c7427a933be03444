//! Operating-system virtual memory for Tarn arenas.
//!
//! [`SystemPages`] implements [`PageProvider`] on top of the native memory
//! API of the build target:
//!
//! | operation | Unix | Windows |
//! |-----------|------|---------|
//! | reserve   | `mmap(PROT_NONE, MAP_PRIVATE \| MAP_ANONYMOUS)` | `VirtualAlloc(MEM_RESERVE, PAGE_NOACCESS)` |
//! | commit    | `mprotect(PROT_READ \| PROT_WRITE)` | `VirtualAlloc(MEM_COMMIT, PAGE_READWRITE)` |
//! | decommit  | `madvise(MADV_DONTNEED)` + `mprotect(PROT_NONE)` | `VirtualFree(MEM_DECOMMIT)` |
//! | release   | `munmap` | `VirtualFree(MEM_RELEASE)` |
//!
//! Exactly one backend is compiled in; callers never see the difference.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(unsafe_op_in_unsafe_fn)]

use std::ptr::NonNull;
use std::sync::OnceLock;

use tarn_core::{PageError, PageProvider};

#[cfg(unix)]
#[path = "unix.rs"]
mod sys;

#[cfg(windows)]
#[path = "windows.rs"]
mod sys;

#[cfg(not(any(unix, windows)))]
compile_error!("tarn-os supports Unix and Windows targets only");

/// The native page provider for the current target.
///
/// Zero-sized and freely copyable; all state lives in the OS.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPages;

impl SystemPages {
    /// Create the provider.
    pub const fn new() -> Self {
        SystemPages
    }
}

/// The OS page size, queried once per process.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(sys::query_page_size)
}

impl PageProvider for SystemPages {
    fn page_size(&self) -> usize {
        page_size()
    }

    fn reserve(&self, size: usize) -> Result<NonNull<u8>, PageError> {
        let base = sys::reserve(size)?;
        tracing::trace!(size, base = base.as_ptr() as usize, "reserved address space");
        Ok(base)
    }

    unsafe fn commit(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
        // SAFETY: forwarded caller contract.
        unsafe { sys::commit(addr, size) }
    }

    unsafe fn decommit(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
        // SAFETY: forwarded caller contract.
        unsafe { sys::decommit(addr, size) }
    }

    unsafe fn release(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
        tracing::trace!(size, base = addr.as_ptr() as usize, "releasing address space");
        // SAFETY: forwarded caller contract.
        unsafe { sys::release(addr, size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    #[test]
    fn page_size_is_power_of_two() {
        let size = SystemPages.page_size();
        assert!(size >= 4096);
        assert!(size.is_power_of_two());
        assert_eq!(size, page_size());
    }

    #[test]
    fn reserve_commit_write_release() {
        let pages = SystemPages::new();
        let page = pages.page_size();
        let base = pages.reserve(64 * MIB).unwrap();
        unsafe {
            pages.commit(base, 2 * page).unwrap();
            let bytes = std::slice::from_raw_parts_mut(base.as_ptr(), 2 * page);
            bytes.fill(0xAB);
            assert!(bytes.iter().all(|&b| b == 0xAB));
            pages.release(base, 64 * MIB).unwrap();
        }
    }

    // Other Unixes may hand back the old contents after MADV_DONTNEED.
    #[cfg(any(target_os = "linux", target_os = "android", windows))]
    #[test]
    fn recommitted_pages_read_zero() {
        let pages = SystemPages::new();
        let page = pages.page_size();
        let base = pages.reserve(16 * page).unwrap();
        unsafe {
            pages.commit(base, 4 * page).unwrap();
            std::ptr::write_bytes(base.as_ptr(), 0x5A, 4 * page);

            let tail = NonNull::new_unchecked(base.as_ptr().add(page));
            pages.decommit(tail, 3 * page).unwrap();
            pages.commit(tail, 3 * page).unwrap();

            let bytes = std::slice::from_raw_parts(base.as_ptr(), 4 * page);
            assert!(bytes[..page].iter().all(|&b| b == 0x5A));
            assert!(bytes[page..].iter().all(|&b| b == 0));
            pages.release(base, 16 * page).unwrap();
        }
    }

    #[test]
    fn commit_is_idempotent() {
        let pages = SystemPages::new();
        let page = pages.page_size();
        let base = pages.reserve(4 * page).unwrap();
        unsafe {
            pages.commit(base, page).unwrap();
            *base.as_ptr() = 7;
            pages.commit(base, page).unwrap();
            assert_eq!(*base.as_ptr(), 7);
            pages.release(base, 4 * page).unwrap();
        }
    }
}
