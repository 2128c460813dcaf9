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

use core::sync::atomic::{AtomicUsize, Ordering};

/// Operation counters owned by the [`SwapManager`](crate::SwapManager).
///
/// Purely telemetry: one count per dispatched write-out and read-in, reset
/// explicitly, no other side effects.
#[derive(Debug, Default)]
pub struct SwapCounters {
    write_outs: AtomicUsize,
    read_ins: AtomicUsize,
}

impl SwapCounters {
    pub fn new() -> Self {
        SwapCounters::default()
    }

    pub(crate) fn count_write_out(&self) {
        self.write_outs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_read_in(&self) {
        self.read_ins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_outs(&self) -> usize {
        self.write_outs.load(Ordering::Relaxed)
    }

    pub fn read_ins(&self) -> usize {
        self.read_ins.load(Ordering::Relaxed)
    }

    /// Resets both counters to zero.
    pub fn reset(&self) {
        self.write_outs.store(0, Ordering::Relaxed);
        self.read_ins.store(0, Ordering::Relaxed);
    }
}
