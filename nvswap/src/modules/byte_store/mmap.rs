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

use std::{
    fs::{remove_file, File},
    mem::ManuallyDrop,
    os::fd::AsRawFd,
    path::Path,
    ptr::{null_mut, NonNull},
};

use libc::{c_void, mmap, msync, munmap, MAP_FAILED, MAP_SHARED, MS_SYNC, PROT_READ, PROT_WRITE};

use super::ByteStoreModule;
use crate::page::PAGE_SIZE;

/// File-backed byte-addressable store, mapped with mmap and made durable
/// with msync. The persistent-memory stand-in on a regular machine.
pub struct MmapByteStore {
    base: NonNull<u8>,

    /// underlying file which is mapped
    file: ManuallyDrop<File>,

    /// path of file, save for deleting file later
    file_path: String,

    slot_count: usize,
}

// Safety: the mapping is fixed for the lifetime of the store; concurrent
// slot access is governed by the swap backend's slot ownership (one page per
// slot, page flag protocol per page).
unsafe impl Send for MmapByteStore {}
unsafe impl Sync for MmapByteStore {}

impl MmapByteStore {
    /// Creates a store of `slot_count` page-sized slots backed by
    /// `file_path`. The file is created (or truncated) and sized to fit.
    pub fn new(file_path: String, slot_count: usize) -> std::io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .truncate(true)
            .create(true)
            .open(file_path.clone())?;

        let size = slot_count * PAGE_SIZE;
        file.set_len(size as u64)?;

        let base = unsafe {
            mmap(
                null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };

        if base == MAP_FAILED {
            return Err(std::io::Error::last_os_error());
        }

        Ok(MmapByteStore {
            // just checked against MAP_FAILED, mmap never returns null
            base: NonNull::new(base as *mut u8).expect("mmap returned null"),
            file: ManuallyDrop::new(file),
            file_path,
            slot_count,
        })
    }

    /// Syncs the whole mapping back to the backing file.
    pub fn persist(&self) -> Result<(), ()> {
        let code = unsafe {
            msync(
                self.base.as_ptr() as *mut c_void,
                self.slot_count * PAGE_SIZE,
                MS_SYNC,
            )
        };

        if code == 0 {
            Ok(())
        } else {
            Err(())
        }
    }
}

impl ByteStoreModule for MmapByteStore {
    fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn base(&self) -> NonNull<u8> {
        self.base
    }
}

impl Drop for MmapByteStore {
    fn drop(&mut self) {
        let code = unsafe {
            munmap(
                self.base.as_ptr() as *mut c_void,
                self.slot_count * PAGE_SIZE,
            )
        };
        if code != 0 {
            log::error!("could not unmap byte store {}", self.file_path);
        }

        // drop and close file before removing
        // note that after this call, file should never be accessed again...
        unsafe {
            ManuallyDrop::drop(&mut self.file);
        }

        if Path::new(self.file_path.as_str()).exists() {
            let _ = remove_file(self.file_path.as_str());
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::test::test_byte_store_slot_isolation;
    use super::{ByteStoreModule, MmapByteStore};

    #[test]
    fn test_mmap_store_slot_isolation() {
        let store =
            MmapByteStore::new("/tmp/test_mmap_store_slot_isolation.tmp".into(), 4).unwrap();
        test_byte_store_slot_isolation(store);
    }

    #[test]
    fn test_mmap_store_persist() {
        let store = MmapByteStore::new("/tmp/test_mmap_store_persist.tmp".into(), 2).unwrap();

        let addr = store.slot_addr(1).as_ptr();
        unsafe { addr.write(0xa5) };

        store.persist().unwrap();

        let on_disk = std::fs::read("/tmp/test_mmap_store_persist.tmp").unwrap();
        assert_eq!(on_disk[crate::page::PAGE_SIZE], 0xa5);
    }
}
