//! Test utilities and mock types for Tarn development.
//!
//! Provides [`MockPages`], an in-process [`PageProvider`] that backs each
//! reservation with real heap memory, tracks which pages are committed,
//! and can be told to refuse operations. Also carries the small value
//! types the arena tests and demos push around.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::alloc::{self, Layout};
use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use tarn_core::{PageError, PageOp, PageProvider};

/// Byte written over decommitted pages so stale reads are obvious.
pub const POISON: u8 = 0xDD;

/// Operation counters for a [`MockPages`] provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MockStats {
    pub reserves: u64,
    pub commits: u64,
    pub decommits: u64,
    pub releases: u64,
    pub failed_commits: u64,
    pub failed_decommits: u64,
}

struct Region {
    base: NonNull<u8>,
    layout: Layout,
    committed: Vec<bool>,
}

impl Region {
    fn addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    fn len(&self) -> usize {
        self.layout.size()
    }
}

#[derive(Default)]
struct MockState {
    regions: Vec<Region>,
    stats: MockStats,
    fail_reserves: bool,
    fail_decommits: bool,
    /// Commits still allowed before every further commit fails.
    commits_left: Option<usize>,
}

impl MockState {
    /// Locate the region and page range for `[addr, addr + size)`.
    fn pages(
        &self,
        op: PageOp,
        addr: usize,
        size: usize,
        page_size: usize,
    ) -> Result<(usize, std::ops::Range<usize>), PageError> {
        let bad = || PageError::new(op, addr, size, None);
        if addr % page_size != 0 || size % page_size != 0 {
            return Err(bad());
        }
        let index = self
            .regions
            .iter()
            .position(|r| addr >= r.addr() && addr + size <= r.addr() + r.len())
            .ok_or_else(bad)?;
        let first = (addr - self.regions[index].addr()) / page_size;
        Ok((index, first..first + size / page_size))
    }
}

#[allow(unsafe_code)]
impl Drop for MockState {
    fn drop(&mut self) {
        for region in self.regions.drain(..) {
            // SAFETY: allocated in `reserve` with this layout.
            unsafe { alloc::dealloc(region.base.as_ptr(), region.layout) };
        }
    }
}

/// In-process page provider for reserve/commit tests.
///
/// Clones share state, so a test can keep one handle while the arena owns
/// another and inspect what the arena did. Freshly committed pages read as
/// zero; decommitted pages are overwritten with [`POISON`].
#[derive(Clone)]
pub struct MockPages {
    page_size: usize,
    state: Rc<RefCell<MockState>>,
}

impl MockPages {
    /// A provider with the given page size (must be a power of two).
    pub fn new(page_size: usize) -> Self {
        assert!(page_size.is_power_of_two(), "page size must be a power of two");
        Self {
            page_size,
            state: Rc::default(),
        }
    }

    /// Make every following reserve fail (or succeed again).
    pub fn fail_reserves(&self, fail: bool) {
        self.state.borrow_mut().fail_reserves = fail;
    }

    /// Make every following decommit fail (or succeed again).
    pub fn fail_decommits(&self, fail: bool) {
        self.state.borrow_mut().fail_decommits = fail;
    }

    /// Allow `n` more successful commits, then fail every commit after.
    pub fn fail_commits_after(&self, n: usize) {
        self.state.borrow_mut().commits_left = Some(n);
    }

    /// Remove any commit failure limit.
    pub fn allow_commits(&self) {
        self.state.borrow_mut().commits_left = None;
    }

    pub fn stats(&self) -> MockStats {
        self.state.borrow().stats
    }

    /// Reservations made and not yet released.
    pub fn live_reservations(&self) -> usize {
        self.state.borrow().regions.len()
    }

    /// Bytes committed across all live reservations.
    pub fn committed_bytes(&self) -> usize {
        let state = self.state.borrow();
        let pages: usize = state
            .regions
            .iter()
            .map(|r| r.committed.iter().filter(|&&c| c).count())
            .sum();
        pages * self.page_size
    }

    /// Whether every page overlapping `[addr, addr + len)` is committed.
    pub fn is_committed(&self, addr: usize, len: usize) -> bool {
        let start = addr - addr % self.page_size;
        let end = (addr + len).next_multiple_of(self.page_size);
        let state = self.state.borrow();
        match state.pages(PageOp::Commit, start, end - start, self.page_size) {
            Ok((index, pages)) => state.regions[index].committed[pages].iter().all(|&c| c),
            Err(_) => false,
        }
    }
}

#[allow(unsafe_code)]
impl PageProvider for MockPages {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn reserve(&self, size: usize) -> Result<NonNull<u8>, PageError> {
        let mut state = self.state.borrow_mut();
        let err = || PageError::new(PageOp::Reserve, 0, size, None);
        if state.fail_reserves || size == 0 || size % self.page_size != 0 {
            return Err(err());
        }
        let layout = Layout::from_size_align(size, self.page_size).map_err(|_| err())?;
        // SAFETY: `layout` has non-zero size.
        let base = NonNull::new(unsafe { alloc::alloc(layout) }).ok_or_else(err)?;
        // SAFETY: `base` points to `size` freshly allocated bytes.
        unsafe { base.as_ptr().write_bytes(POISON, size) };
        state.regions.push(Region {
            base,
            layout,
            committed: vec![false; size / self.page_size],
        });
        state.stats.reserves += 1;
        Ok(base)
    }

    unsafe fn commit(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
        let mut state = self.state.borrow_mut();
        let at = addr.as_ptr() as usize;
        if let Some(left) = state.commits_left {
            if left == 0 {
                state.stats.failed_commits += 1;
                return Err(PageError::new(PageOp::Commit, at, size, None));
            }
            state.commits_left = Some(left - 1);
        }
        let (index, pages) = state.pages(PageOp::Commit, at, size, self.page_size)?;
        let page_size = self.page_size;
        let region = &mut state.regions[index];
        for page in pages {
            if !region.committed[page] {
                region.committed[page] = true;
                // SAFETY: the page lies inside this region's allocation.
                unsafe {
                    region
                        .base
                        .as_ptr()
                        .add(page * page_size)
                        .write_bytes(0, page_size)
                };
            }
        }
        state.stats.commits += 1;
        Ok(())
    }

    unsafe fn decommit(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
        let mut state = self.state.borrow_mut();
        let at = addr.as_ptr() as usize;
        if state.fail_decommits {
            state.stats.failed_decommits += 1;
            return Err(PageError::new(PageOp::Decommit, at, size, Some(12)));
        }
        let (index, pages) = state.pages(PageOp::Decommit, at, size, self.page_size)?;
        let region = &mut state.regions[index];
        region.committed[pages].fill(false);
        // SAFETY: the range was validated against this region above.
        unsafe { addr.as_ptr().write_bytes(POISON, size) };
        state.stats.decommits += 1;
        Ok(())
    }

    unsafe fn release(&self, addr: NonNull<u8>, size: usize) -> Result<(), PageError> {
        let mut state = self.state.borrow_mut();
        let err = || PageError::new(PageOp::Release, addr.as_ptr() as usize, size, None);
        let index = state
            .regions
            .iter()
            .position(|r| r.base == addr && r.len() == size)
            .ok_or_else(err)?;
        let region = state.regions.swap_remove(index);
        // SAFETY: allocated in `reserve` with this layout and now removed.
        unsafe { alloc::dealloc(region.base.as_ptr(), region.layout) };
        state.stats.releases += 1;
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────

/// A tiny expression node, the classic arena payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expr {
    Int(i32),
    Str(&'static str),
}

/// Three bytes with alignment 1, for checking that pushes pack tightly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestAlign {
    pub a: u8,
    pub b: u8,
    pub c: u8,
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    #[test]
    fn reserve_commit_decommit_release() {
        let mock = MockPages::new(PAGE);
        let base = mock.reserve(4 * PAGE).unwrap();
        assert_eq!(mock.live_reservations(), 1);
        assert_eq!(base.as_ptr() as usize % PAGE, 0);

        unsafe { mock.commit(base, 2 * PAGE).unwrap() };
        assert_eq!(mock.committed_bytes(), 2 * PAGE);
        assert!(mock.is_committed(base.as_ptr() as usize, 2 * PAGE));
        assert!(!mock.is_committed(base.as_ptr() as usize, 3 * PAGE));

        unsafe { mock.decommit(base, 2 * PAGE).unwrap() };
        assert_eq!(mock.committed_bytes(), 0);
        assert_eq!(unsafe { *base.as_ptr() }, POISON);

        unsafe { mock.release(base, 4 * PAGE).unwrap() };
        assert_eq!(mock.live_reservations(), 0);
        assert_eq!(
            mock.stats(),
            MockStats {
                reserves: 1,
                commits: 1,
                decommits: 1,
                releases: 1,
                ..MockStats::default()
            }
        );
    }

    #[test]
    fn committed_pages_read_zero() {
        let mock = MockPages::new(PAGE);
        let base = mock.reserve(PAGE).unwrap();
        unsafe { mock.commit(base, PAGE).unwrap() };
        let bytes = unsafe { std::slice::from_raw_parts(base.as_ptr(), PAGE) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn commit_limit_fails_after_budget() {
        let mock = MockPages::new(PAGE);
        let base = mock.reserve(4 * PAGE).unwrap();
        mock.fail_commits_after(1);
        unsafe {
            assert!(mock.commit(base, PAGE).is_ok());
            let err = mock.commit(base, PAGE).unwrap_err();
            assert_eq!(err.op, PageOp::Commit);
        }
        assert_eq!(mock.stats().failed_commits, 1);
        mock.allow_commits();
        assert!(unsafe { mock.commit(base, PAGE) }.is_ok());
    }

    #[test]
    fn misaligned_ranges_are_rejected() {
        let mock = MockPages::new(PAGE);
        let base = mock.reserve(2 * PAGE).unwrap();
        assert!(unsafe { mock.commit(base, 100) }.is_err());
        assert!(unsafe { mock.release(base, PAGE) }.is_err());
    }

    #[test]
    fn dropping_last_handle_frees_regions() {
        let mock = MockPages::new(PAGE);
        mock.reserve(PAGE).unwrap();
        drop(mock);
    }
}
