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

use crate::page::{PAGE_SHIFT, PAGE_SIZE};

/// Size of a block device sector in bytes
pub const SECTOR_SIZE: usize = 512;
pub const SECTOR_SHIFT: u32 = 9;

static_assertions::const_assert!(SECTOR_SIZE == 1 << SECTOR_SHIFT);
static_assertions::const_assert!(PAGE_SIZE % SECTOR_SIZE == 0);

/// Identifies a swap device registered with a
/// [`SwapManager`](crate::SwapManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapDeviceId(pub u16);

/// Logical swap location of a page: which device its backing copy lives on
/// and at which page-granular offset.
///
/// Encodes no backend-specific detail; the owning backend interprets the
/// offset either as a sector range or as a slot-map index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapEntry {
    device: SwapDeviceId,
    offset: usize,
}

impl SwapEntry {
    pub fn new(device: SwapDeviceId, offset: usize) -> Self {
        SwapEntry { device, offset }
    }

    pub fn device(&self) -> SwapDeviceId {
        self.device
    }

    /// Page-granular logical offset on the device
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// First sector of the backing copy on a block device
    pub fn sector(&self) -> u64 {
        (self.offset as u64) << (PAGE_SHIFT - SECTOR_SHIFT)
    }
}
