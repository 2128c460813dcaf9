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

use crate::counters::SwapCounters;
use crate::io_error::IoError;
use crate::modules::swap_backend::SwapBackendModule;
use crate::page::{Page, PageFlag, PageRef};
use crate::swap_entry::SwapDeviceId;

/// The single entry point for moving pages to and from swap.
///
/// Owns the registered backends (one per device, selected at runtime by the
/// page's swap entry), the operation counters, and the page-state protocol
/// around every transfer. The page lock is the callers' mutual exclusion:
/// both operations require the page locked on entry and guarantee it ends up
/// unlocked, either on return or from the transfer's completion context.
pub struct SwapManager {
    devices: Vec<Box<dyn SwapBackendModule>>,
    counters: SwapCounters,

    /// Ownership check injected by the memory manager: returns true if the
    /// page's backing copy is already current and the in-memory copy can be
    /// dropped without writing.
    stale_swap_check: fn(&Page) -> bool,
}

impl SwapManager {
    pub fn new(stale_swap_check: fn(&Page) -> bool) -> Self {
        SwapManager {
            devices: Vec::new(),
            counters: SwapCounters::new(),
            stale_swap_check,
        }
    }

    /// Registers a backend and returns the device id to build swap entries
    /// with.
    pub fn register_device(&mut self, backend: Box<dyn SwapBackendModule>) -> SwapDeviceId {
        assert!(self.devices.len() < u16::MAX as usize, "too many devices");

        self.devices.push(backend);
        SwapDeviceId((self.devices.len() - 1) as u16)
    }

    pub fn counters(&self) -> &SwapCounters {
        &self.counters
    }

    /// Writes a locked page out to its swap location.
    ///
    /// If the backing copy is already current, no I/O is issued and the page
    /// is simply unlocked. Otherwise the transfer is dispatched to the
    /// owning backend; for block devices the write is still in flight when
    /// this returns (`writeback` set, page unlocked).
    ///
    /// On [`IoError::ResourceExhausted`] the page is re-dirtied and
    /// unlocked, ready for the caller to retry; it is never lost.
    pub fn write_out(&self, page: &PageRef) -> Result<(), IoError> {
        assert!(
            page.test_flag(PageFlag::Locked),
            "write_out requires a locked page"
        );

        // stale swap cache: notice it here and skip the unnecessary final
        // write entirely
        if (self.stale_swap_check)(page) {
            log::trace!("dropping stale swap cache page, no write-out needed");
            page.unlock();
            return Ok(());
        }

        let backend = self.backend(page.swap_entry().device());

        page.set_flag(PageFlag::Writeback);
        self.counters.count_write_out();

        if let Err(err) = backend.write(page) {
            // the transfer never started: restore a safely retryable state
            page.set_flag(PageFlag::Dirty);
            page.clear_flag(PageFlag::Writeback);
            page.unlock();
            return Err(err);
        }

        Ok(())
    }

    /// Reads a locked, not-uptodate page back in from its swap location.
    ///
    /// For byte-addressable devices the page is uptodate and unlocked when
    /// this returns; for block devices both happen in the completion
    /// context. If no descriptor could be allocated the page is unlocked
    /// and stays not-uptodate, so a subsequent fault retries.
    pub fn read_in(&self, page: &PageRef) -> Result<(), IoError> {
        assert!(
            page.test_flag(PageFlag::Locked),
            "read_in requires a locked page"
        );
        assert!(
            !page.test_flag(PageFlag::Uptodate),
            "read_in into an uptodate page"
        );

        let backend = self.backend(page.swap_entry().device());

        if let Err(err) = backend.read(page) {
            page.unlock();
            return Err(err);
        }

        // only dispatched reads count, a read that never started leaves no
        // trace beyond the error
        self.counters.count_read_in();
        Ok(())
    }

    fn backend(&self, device: SwapDeviceId) -> &dyn SwapBackendModule {
        // an unknown device id means the swap entry came from a corrupted
        // allocator, nothing sane can be done with the page
        self.devices
            .get(device.0 as usize)
            .unwrap_or_else(|| panic!("swap entry references unregistered device {}", device.0))
            .as_ref()
    }
}
