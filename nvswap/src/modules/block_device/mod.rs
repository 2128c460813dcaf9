mod file_device;

pub use file_device::FileBlockDevice;

use std::sync::{Arc, Condvar, Mutex};

use crate::io_error::IoError;
use crate::page::PageRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDirection {
    Read,
    Write,
}

/// A single-page I/O request: the page is the sole data buffer, the sector
/// addresses `PAGE_SIZE / SECTOR_SIZE` consecutive sectors. Transient, one
/// per operation.
pub struct IoRequest {
    pub direction: IoDirection,
    pub sector: u64,
    pub page: PageRef,
}

/// A device that executes single-page requests asynchronously.
///
/// `submit` is fire-and-forget: it must not block on the transfer and the
/// transfer cannot be cancelled afterwards. The outcome is only observable
/// through the returned [`IoHandle`], whose continuation may run on a
/// different thread (the device's completion context). Timeout handling is
/// the device's business, not the caller's.
pub trait BlockDeviceModule {
    fn submit(&self, request: IoRequest) -> IoHandle;

    /// Device capacity in sectors
    fn sector_count(&self) -> u64;
}

struct CompletionInner {
    result: Option<Result<(), IoError>>,
    continuation: Option<Box<dyn FnOnce(Result<(), IoError>) + Send>>,
}

struct CompletionState {
    inner: Mutex<CompletionInner>,
    finished: Condvar,
}

/// Completion handle for a submitted request.
///
/// Replaces a raw completion callback on the request itself: the submitter
/// gets the handle back and registers its continuation on it, so page
/// lifecycle logic never leaks into the device. Registration and completion
/// can race; whichever side comes second runs the continuation.
pub struct IoHandle {
    state: Arc<CompletionState>,
}

impl IoHandle {
    /// Creates a connected handle/completer pair. Device implementations
    /// keep the [`IoCompleter`] and hand the handle back from `submit`.
    pub fn new_pair() -> (IoHandle, IoCompleter) {
        let state = Arc::new(CompletionState {
            inner: Mutex::new(CompletionInner {
                result: None,
                continuation: None,
            }),
            finished: Condvar::new(),
        });

        (
            IoHandle {
                state: Arc::clone(&state),
            },
            IoCompleter { state },
        )
    }

    /// Registers the continuation to run when the request completes.
    ///
    /// If the request already completed, the continuation runs immediately
    /// on the calling thread; otherwise it runs on the completion context.
    pub fn on_complete(&self, continuation: impl FnOnce(Result<(), IoError>) + Send + 'static) {
        let ready = {
            let mut inner = self.state.inner.lock().unwrap();
            match inner.result {
                Some(result) => Some(result),
                None => {
                    let previous = inner.continuation.replace(Box::new(continuation));
                    assert!(previous.is_none(), "continuation registered twice");
                    return;
                }
            }
        };

        if let Some(result) = ready {
            continuation(result);
        }
    }

    /// Blocks until the request completed. Only the result is synchronized;
    /// a continuation registered on this handle may still be running on the
    /// completion context when this returns. Meant for callers that need a
    /// synchronization point, e.g. tests and teardown paths.
    pub fn wait(&self) -> Result<(), IoError> {
        let mut inner = self.state.inner.lock().unwrap();
        loop {
            if let Some(result) = inner.result {
                return result;
            }

            inner = self.state.finished.wait(inner).unwrap();
        }
    }
}

/// Device-side end of an [`IoHandle`]. Consumed by exactly one completion;
/// dropping it without completing fails the request with
/// [`IoError::Aborted`], a request is never lost silently.
pub struct IoCompleter {
    state: Arc<CompletionState>,
}

impl IoCompleter {
    pub fn complete(self, result: Result<(), IoError>) {
        self.finish(result);
    }

    fn finish(&self, result: Result<(), IoError>) {
        let continuation = {
            let mut inner = self.state.inner.lock().unwrap();
            debug_assert!(inner.result.is_none(), "request completed twice");
            inner.result = Some(result);
            inner.continuation.take()
        };

        // run outside the lock: the continuation may call back into wait()ers
        if let Some(continuation) = continuation {
            continuation(result);
        }

        self.state.finished.notify_all();
    }
}

impl Drop for IoCompleter {
    fn drop(&mut self) {
        let abandoned = self.state.inner.lock().unwrap().result.is_none();
        if abandoned {
            log::error!("i/o request abandoned by its device");
            self.finish(Err(IoError::Aborted));
        }
    }
}
