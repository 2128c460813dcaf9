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

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use super::SwapBackendModule;
use crate::io_error::IoError;
use crate::modules::block_device::{BlockDeviceModule, IoDirection, IoRequest};
use crate::page::{PageFlag, PageRef};
use crate::swap_config::SwapConfig;
use crate::swap_entry::SwapDeviceId;

/// Failure diagnostic naming both the device and the failing location; the
/// error alone only carries the sector, which is ambiguous once several
/// devices are registered.
fn failure_diagnostic(device: SwapDeviceId, err: &IoError) -> String {
    format!("swap device {}: {}", device.0, err)
}

/// Bounded budget of in-flight single-page descriptors. Exhaustion is an
/// expected, locally recovered condition, never fatal.
struct DescriptorPool {
    inflight: AtomicUsize,
    capacity: usize,
}

impl DescriptorPool {
    fn new(capacity: usize) -> Self {
        DescriptorPool {
            inflight: AtomicUsize::new(0),
            capacity,
        }
    }

    fn try_acquire(&self) -> bool {
        self.inflight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |inflight| {
                if inflight < self.capacity {
                    Some(inflight + 1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    fn release(&self) {
        let prev = self.inflight.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "descriptor released twice");
    }
}

/// Swap backend for block devices: classic asynchronous write-back.
///
/// Write-out unlocks the page before the transfer finishes; the completion
/// context is the only place that clears `writeback` (writes) or sets
/// `uptodate` and unlocks (reads) for this backend.
pub struct BlockSwapBackend<D: BlockDeviceModule> {
    device: D,
    descriptors: Arc<DescriptorPool>,
}

impl<D: BlockDeviceModule> BlockSwapBackend<D> {
    pub fn new(device: D, config: SwapConfig) -> Self {
        BlockSwapBackend {
            device,
            descriptors: Arc::new(DescriptorPool::new(config.max_inflight_io)),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: BlockDeviceModule + Send + Sync> SwapBackendModule for BlockSwapBackend<D> {
    fn write(&self, page: &PageRef) -> Result<(), IoError> {
        if !self.descriptors.try_acquire() {
            return Err(IoError::ResourceExhausted);
        }

        let sector = page.swap_entry().sector();
        log::trace!("submitting write-out at sector {}", sector);

        // async write-back: hand the buffer off to the transfer and unlock
        // before it is confirmed; writeback stays set until completion
        page.unlock();

        let handle = self.device.submit(IoRequest {
            direction: IoDirection::Write,
            sector,
            page: Arc::clone(page),
        });

        let completion_page = Arc::clone(page);
        let descriptors = Arc::clone(&self.descriptors);
        handle.on_complete(move |result| {
            if let Err(err) = result {
                // The write never reached the device. Re-dirty the page so
                // it is not reclaimed with its only copy incomplete, and
                // take it off the reclaim fast path.
                completion_page.set_flag(PageFlag::Error);
                completion_page.set_flag(PageFlag::Dirty);
                log::error!(
                    "{}",
                    failure_diagnostic(completion_page.swap_entry().device(), &err)
                );
                completion_page.clear_flag(PageFlag::Reclaim);
            }

            completion_page.clear_flag(PageFlag::Writeback);
            descriptors.release();
        });

        Ok(())
    }

    fn read(&self, page: &PageRef) -> Result<(), IoError> {
        if !self.descriptors.try_acquire() {
            return Err(IoError::ResourceExhausted);
        }

        let sector = page.swap_entry().sector();
        log::trace!("submitting read-in at sector {}", sector);

        let handle = self.device.submit(IoRequest {
            direction: IoDirection::Read,
            sector,
            page: Arc::clone(page),
        });

        let completion_page = Arc::clone(page);
        let descriptors = Arc::clone(&self.descriptors);
        handle.on_complete(move |result| {
            match result {
                Ok(()) => {
                    completion_page.set_flag(PageFlag::Uptodate);
                }
                Err(err) => {
                    completion_page.set_flag(PageFlag::Error);
                    completion_page.clear_flag(PageFlag::Uptodate);
                    log::error!(
                        "{}",
                        failure_diagnostic(completion_page.swap_entry().device(), &err)
                    );
                }
            }

            // unlocking is the synchronization point other waiters depend
            // on, it has to come last
            completion_page.unlock();
            descriptors.release();
        });

        Ok(())
    }
}
