/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use core::{
    cell::UnsafeCell,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU8, Ordering},
};
use std::sync::Arc;

use crate::swap_entry::SwapEntry;

/// Size of a single page in bytes
pub const PAGE_SIZE: usize = 4096;
pub const PAGE_SHIFT: u32 = 12;

static_assertions::const_assert!(PAGE_SIZE == 1 << PAGE_SHIFT);

/// Page state bits.
///
/// These mirror the state machine the surrounding memory manager runs on a
/// page: every bit can be set or cleared individually and atomically, from
/// any thread that currently owns the corresponding part of the protocol
/// (see [`Page`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageFlag {
    /// Exclusive owner of the page's swap state transition
    Locked = 1 << 0,
    /// Page content is newer than its backing copy
    Dirty = 1 << 1,
    /// A write to backing storage is in flight, do not reclaim or remap
    Writeback = 1 << 2,
    /// Page content is valid (filled from its backing copy)
    Uptodate = 1 << 3,
    /// The last transfer for this page failed
    Error = 1 << 4,
    /// Hint that the page should be fed back to the reclaim scan
    Reclaim = 1 << 5,
}

pub(crate) struct PageFlags(AtomicU8);

impl PageFlags {
    fn empty() -> Self {
        PageFlags(AtomicU8::new(0))
    }

    pub(crate) fn set(&self, flag: PageFlag) -> bool {
        let prev = self.0.fetch_or(flag as u8, Ordering::SeqCst);
        (prev & flag as u8) != 0
    }

    pub(crate) fn clear(&self, flag: PageFlag) -> bool {
        let prev = self.0.fetch_and(!(flag as u8), Ordering::SeqCst);
        (prev & flag as u8) != 0
    }

    pub(crate) fn test(&self, flag: PageFlag) -> bool {
        (self.0.load(Ordering::SeqCst) & flag as u8) != 0
    }
}

/// Shared handle to a page.
///
/// Block device completion runs on a different thread than the submitter, so
/// it has to keep the page alive on its own.
pub type PageRef = Arc<Page>;

/// A fixed-size memory unit that can be moved to and from backing storage.
///
/// The page's residency is owned by the external memory manager; this crate
/// only observes and mutates the state flags and the data buffer. Data access
/// goes through [`Page::map`] and is guarded by the flag protocol:
///
/// * whoever holds [`PageFlag::Locked`] may read and write the buffer,
/// * after the lock was handed off to an in-flight transfer (asynchronous
///   write-back), the buffer belongs to that transfer until `writeback` is
///   cleared (writes) or the page is unlocked again (reads).
pub struct Page {
    flags: PageFlags,
    entry: SwapEntry,
    data: UnsafeCell<[u8; PAGE_SIZE]>,
}

// Safety: the data buffer is only touched through `map`, whose callers have
// to follow the lock/writeback ownership protocol above. All flags are
// atomic.
unsafe impl Send for Page {}
unsafe impl Sync for Page {}

impl Page {
    /// Creates a new zeroed page backed by the given swap location.
    ///
    /// A page has at most one swap entry at a time; here it is fixed for the
    /// lifetime of the page, assignment is the external allocator's job.
    pub fn new(entry: SwapEntry) -> PageRef {
        Arc::new(Page {
            flags: PageFlags::empty(),
            entry,
            data: UnsafeCell::new([0u8; PAGE_SIZE]),
        })
    }

    pub fn swap_entry(&self) -> SwapEntry {
        self.entry
    }

    /// Acquires the page lock. The caller must be the only lock holder.
    pub fn lock(&self) {
        let was_locked = self.flags.set(PageFlag::Locked);
        assert!(!was_locked, "page is already locked");
    }

    /// Releases the page lock, waking up anyone polling for it.
    pub fn unlock(&self) {
        let was_locked = self.flags.clear(PageFlag::Locked);
        debug_assert!(was_locked, "unlock of an unlocked page");
    }

    pub fn set_flag(&self, flag: PageFlag) {
        self.flags.set(flag);
    }

    pub fn clear_flag(&self, flag: PageFlag) {
        self.flags.clear(flag);
    }

    pub fn test_flag(&self, flag: PageFlag) -> bool {
        self.flags.test(flag)
    }

    /// Maps the page's data for direct access (the kmap equivalent).
    ///
    /// ### Safety
    ///
    /// The caller must own the buffer under the flag protocol described on
    /// [`Page`]: either hold the page lock, or be the transfer the lock was
    /// handed off to. No two owners may map the page for writing at once.
    pub unsafe fn map(&self) -> PageMapping<'_> {
        PageMapping {
            data: self.data.get(),
            _marker: PhantomData,
        }
    }
}

/// Scoped mapping of a page's data buffer.
pub struct PageMapping<'a> {
    data: *mut [u8; PAGE_SIZE],
    _marker: PhantomData<&'a Page>,
}

impl Deref for PageMapping<'_> {
    type Target = [u8; PAGE_SIZE];

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.data }
    }
}

impl DerefMut for PageMapping<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.data }
    }
}
