//! Win32 backend: `VirtualAlloc`, `VirtualFree`, `GetSystemInfo`.

use std::ffi::c_void;
use std::io;
use std::mem;
use std::ptr::{self, NonNull};

use tarn_core::{PageError, PageOp};
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS,
    PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

fn last_error(op: PageOp, addr: usize, size: usize) -> PageError {
    PageError::new(op, addr, size, io::Error::last_os_error().raw_os_error())
}

pub(crate) fn query_page_size() -> usize {
    // SAFETY: SYSTEM_INFO is plain data; all-zero is a valid value.
    let mut info: SYSTEM_INFO = unsafe { mem::zeroed() };
    // SAFETY: `info` is a valid out-pointer.
    unsafe { GetSystemInfo(&mut info) };
    info.dwPageSize as usize
}

pub(crate) fn reserve(size: usize) -> Result<NonNull<u8>, PageError> {
    // SAFETY: a fresh reservation at a system-chosen address.
    let p = unsafe { VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS) };
    NonNull::new(p.cast::<u8>()).ok_or_else(|| last_error(PageOp::Reserve, 0, size))
}

/// # Safety
///
/// `[addr, addr + size)` is page-aligned and inside a live reservation.
pub(crate) unsafe fn commit(addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
    // SAFETY: caller guarantees the range lies in one of our reservations.
    let p = unsafe {
        VirtualAlloc(
            addr.as_ptr().cast::<c_void>(),
            size,
            MEM_COMMIT,
            PAGE_READWRITE,
        )
    };
    if p.is_null() {
        return Err(last_error(PageOp::Commit, addr.as_ptr() as usize, size));
    }
    Ok(())
}

/// # Safety
///
/// As for [`commit`]; the contents of the range are discarded.
pub(crate) unsafe fn decommit(addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
    // SAFETY: caller guarantees the range lies in one of our reservations.
    let ok = unsafe { VirtualFree(addr.as_ptr().cast::<c_void>(), size, MEM_DECOMMIT) };
    if ok == 0 {
        return Err(last_error(PageOp::Decommit, addr.as_ptr() as usize, size));
    }
    Ok(())
}

/// # Safety
///
/// `addr` is the base of a whole reservation that is no longer used.
pub(crate) unsafe fn release(addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
    // MEM_RELEASE requires a zero size and frees the whole reservation.
    // SAFETY: caller hands over the whole reservation.
    let ok = unsafe { VirtualFree(addr.as_ptr().cast::<c_void>(), 0, MEM_RELEASE) };
    if ok == 0 {
        return Err(last_error(PageOp::Release, addr.as_ptr() as usize, size));
    }
    Ok(())
}
