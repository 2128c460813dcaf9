mod block;
mod byte_addressable;

pub use block::BlockSwapBackend;
pub use byte_addressable::ByteSwapBackend;

use crate::io_error::IoError;
use crate::page::PageRef;

/// One swap backend per registered device, selected at runtime by the
/// coordinator through the page's swap entry.
///
/// Page-state contract shared by all implementations:
///
/// * `write` is entered with the page locked and `writeback` set. By the
///   time it returns the page is unlocked; `writeback` is cleared either
///   before returning (synchronous transfer) or by the completion context
///   (asynchronous transfer). An `Err` return means the transfer never
///   started and the page state was not touched, the coordinator restores
///   the page for retry.
/// * `read` is entered with the page locked and not uptodate. On the
///   successful path `uptodate` is set and the page unlocked, in that
///   order, by whichever context finishes the transfer. An `Err` return
///   means the transfer never started; the page is still locked.
pub trait SwapBackendModule: Send + Sync {
    fn write(&self, page: &PageRef) -> Result<(), IoError>;

    fn read(&self, page: &PageRef) -> Result<(), IoError>;
}

// so a backend can be registered with a coordinator and still be driven
// directly, e.g. by the slot allocation policy
impl<T: SwapBackendModule + ?Sized> SwapBackendModule for std::sync::Arc<T> {
    fn write(&self, page: &PageRef) -> Result<(), IoError> {
        (**self).write(page)
    }

    fn read(&self, page: &PageRef) -> Result<(), IoError> {
        (**self).read(page)
    }
}
