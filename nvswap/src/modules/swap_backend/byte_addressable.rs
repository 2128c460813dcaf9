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

use core::ptr::copy_nonoverlapping;
use std::sync::Mutex;

use super::SwapBackendModule;
use crate::io_error::IoError;
use crate::modules::byte_store::ByteStoreModule;
use crate::page::{PageFlag, PageRef, PAGE_SIZE};
use crate::slot_aging::SlotAging;

struct ByteSwapInner {
    /// logical page offset -> physical slot, unique and dense
    slot_map: Vec<u32>,
    aging: SlotAging,
}

/// Swap backend for byte-addressable stores: a synchronous memory copy per
/// transfer, no descriptors, no completion context.
///
/// Every write bumps the target slot's age and re-heapifies the aging
/// structure; reads change no wear state. Slot map and aging updates are
/// serialized per device behind one mutex, the heap array is not safe for
/// concurrent mutation.
pub struct ByteSwapBackend<S: ByteStoreModule> {
    store: S,
    inner: Mutex<ByteSwapInner>,
}

impl<S: ByteStoreModule> ByteSwapBackend<S> {
    /// Backend with the identity slot map (logical offset i lives in
    /// physical slot i).
    pub fn new(store: S) -> Self {
        let slot_count = store.slot_count();
        Self::with_slot_map(store, (0..slot_count as u32).collect())
    }

    /// Backend with an explicit logical-to-physical slot map, as handed
    /// over by the external slot allocation policy.
    pub fn with_slot_map(store: S, slot_map: Vec<u32>) -> Self {
        let slot_count = store.slot_count();
        assert!(
            slot_map.len() == slot_count,
            "slot map must cover the whole device ({} entries for {} slots)",
            slot_map.len(),
            slot_count
        );

        let mut seen = vec![false; slot_count];
        for &slot in &slot_map {
            assert!((slot as usize) < slot_count, "slot map entry out of range");
            assert!(!seen[slot as usize], "slot map entries must be unique");
            seen[slot as usize] = true;
        }

        ByteSwapBackend {
            store,
            inner: Mutex::new(ByteSwapInner {
                slot_map,
                aging: SlotAging::new(slot_count),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `f` with exclusive access to the device's aging structure.
    /// This is how the external wear-leveling policy peeks at and extracts
    /// reuse candidates.
    pub fn with_aging<R>(&self, f: impl FnOnce(&mut SlotAging) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner.aging)
    }
}

impl<S: ByteStoreModule + Send + Sync> SwapBackendModule for ByteSwapBackend<S> {
    fn write(&self, page: &PageRef) -> Result<(), IoError> {
        let offset = page.swap_entry().offset();
        log::trace!("memory write-out of logical offset {}", offset);

        let mut inner = self.inner.lock().unwrap();
        let slot = inner.slot_map[offset] as usize;
        let slot_addr = self.store.slot_addr(slot);

        // The copy is synchronous, but the page is still unlocked before it
        // is confirmed; the set writeback flag keeps reclaim away until the
        // slot holds the full copy.
        page.unlock();

        unsafe {
            // Safety: the buffer was handed off to this transfer (writeback
            // is set), the slot is exclusively ours while the device mutex
            // is held
            let mapping = page.map();
            copy_nonoverlapping(mapping.as_ptr(), slot_addr.as_ptr(), PAGE_SIZE);
        }

        inner.aging.record_write(slot);
        drop(inner);

        page.clear_flag(PageFlag::Writeback);
        Ok(())
    }

    fn read(&self, page: &PageRef) -> Result<(), IoError> {
        let offset = page.swap_entry().offset();
        log::trace!("memory read-in of logical offset {}", offset);

        let inner = self.inner.lock().unwrap();
        let slot = inner.slot_map[offset] as usize;
        let slot_addr = self.store.slot_addr(slot);

        unsafe {
            // Safety: the caller holds the page lock; reads do not move
            // slots, so the map entry stays valid
            let mut mapping = page.map();
            copy_nonoverlapping(slot_addr.as_ptr(), mapping.as_mut_ptr(), PAGE_SIZE);
        }
        drop(inner);

        // reads leave the wear state alone, only writes age a slot

        page.set_flag(PageFlag::Uptodate);
        page.unlock();
        Ok(())
    }
}
