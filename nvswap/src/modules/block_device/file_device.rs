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
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
    sync::mpsc,
    thread,
};

use super::{BlockDeviceModule, IoCompleter, IoDirection, IoHandle, IoRequest};
use crate::io_error::IoError;
use crate::page::PAGE_SIZE;
use crate::swap_entry::SECTOR_SIZE;

enum WorkerMessage {
    Request(IoRequest, IoCompleter),
    Shutdown,
}

/// Block device emulated on top of a regular file.
///
/// Requests are executed in submission order on a dedicated worker thread,
/// so completions run concurrently with the submitter, like a real
/// completion context would.
pub struct FileBlockDevice {
    queue: mpsc::Sender<WorkerMessage>,
    worker: Option<thread::JoinHandle<()>>,

    /// path of the backing file, kept for deleting it later
    file_path: String,

    sector_count: u64,
}

impl FileBlockDevice {
    pub fn new(file_path: String, sector_count: u64) -> std::io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .truncate(true)
            .create(true)
            .open(file_path.clone())?;

        file.set_len(sector_count * SECTOR_SIZE as u64)?;

        let (queue, requests) = mpsc::channel();
        let worker_path = file_path.clone();
        let worker = thread::spawn(move || {
            run_worker(file, worker_path, sector_count, requests);
        });

        Ok(FileBlockDevice {
            queue,
            worker: Some(worker),
            file_path,
            sector_count,
        })
    }
}

impl BlockDeviceModule for FileBlockDevice {
    fn submit(&self, request: IoRequest) -> IoHandle {
        let (handle, completer) = IoHandle::new_pair();
        let direction = request.direction;
        let sector = request.sector;

        if let Err(mpsc::SendError(message)) =
            self.queue.send(WorkerMessage::Request(request, completer))
        {
            // worker is gone, the request can never be executed
            if let WorkerMessage::Request(_, completer) = message {
                completer.complete(Err(match direction {
                    IoDirection::Write => IoError::DeviceWriteFailed { sector },
                    IoDirection::Read => IoError::DeviceReadFailed { sector },
                }));
            }
        }

        handle
    }

    fn sector_count(&self) -> u64 {
        self.sector_count
    }
}

impl Drop for FileBlockDevice {
    fn drop(&mut self) {
        // drain the queue before removing the backing file
        let _ = self.queue.send(WorkerMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }

        if Path::new(self.file_path.as_str()).exists() {
            let _ = remove_file(self.file_path.as_str());
        }
    }
}

fn run_worker(
    mut file: File,
    file_path: String,
    sector_count: u64,
    requests: mpsc::Receiver<WorkerMessage>,
) {
    const SECTORS_PER_PAGE: u64 = (PAGE_SIZE / SECTOR_SIZE) as u64;

    while let Ok(WorkerMessage::Request(request, completer)) = requests.recv() {
        if request.sector + SECTORS_PER_PAGE > sector_count {
            log::error!(
                "request beyond end of swap device {} (sector {}, capacity {})",
                file_path,
                request.sector,
                sector_count
            );
            completer.complete(Err(match request.direction {
                IoDirection::Write => IoError::DeviceWriteFailed {
                    sector: request.sector,
                },
                IoDirection::Read => IoError::DeviceReadFailed {
                    sector: request.sector,
                },
            }));
            continue;
        }

        let byte_offset = request.sector * SECTOR_SIZE as u64;
        let result = match request.direction {
            IoDirection::Write => {
                // Safety: the submitter handed the buffer off to this
                // transfer; it stays untouched until writeback is cleared
                let mapping = unsafe { request.page.map() };
                file.seek(SeekFrom::Start(byte_offset))
                    .and_then(|_| file.write_all(&mapping[..]))
                    .map_err(|_| IoError::DeviceWriteFailed {
                        sector: request.sector,
                    })
            }
            IoDirection::Read => {
                // Safety: the page is locked for the duration of the read
                let mut mapping = unsafe { request.page.map() };
                file.seek(SeekFrom::Start(byte_offset))
                    .and_then(|_| file.read_exact(&mut mapping[..]))
                    .map_err(|_| IoError::DeviceReadFailed {
                        sector: request.sector,
                    })
            }
        };

        completer.complete(result);
    }
}
