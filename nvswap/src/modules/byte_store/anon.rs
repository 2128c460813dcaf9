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

use std::ptr::{null_mut, NonNull};

use libc::{c_void, mmap, munmap, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};

use super::ByteStoreModule;
use crate::page::PAGE_SIZE;

/// Volatile byte-addressable store on an anonymous mapping. Useful when the
/// backing region is plain spare RAM, and for tests.
pub struct AnonByteStore {
    base: NonNull<u8>,
    slot_count: usize,
}

// Safety: same slot ownership rules as the file-backed store
unsafe impl Send for AnonByteStore {}
unsafe impl Sync for AnonByteStore {}

impl AnonByteStore {
    pub fn new(slot_count: usize) -> Result<Self, ()> {
        let base = unsafe {
            mmap(
                null_mut(),
                slot_count * PAGE_SIZE,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if base == MAP_FAILED {
            return Err(());
        }

        Ok(AnonByteStore {
            base: NonNull::new(base as *mut u8).ok_or(())?,
            slot_count,
        })
    }
}

impl ByteStoreModule for AnonByteStore {
    fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn base(&self) -> NonNull<u8> {
        self.base
    }
}

impl Drop for AnonByteStore {
    fn drop(&mut self) {
        let code = unsafe {
            munmap(
                self.base.as_ptr() as *mut c_void,
                self.slot_count * PAGE_SIZE,
            )
        };

        if code != 0 {
            log::error!("could not unmap anonymous byte store");
        }
    }
}
