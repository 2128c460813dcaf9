use core::fmt;

/// Errors a swap transfer can surface to its caller or its completion
/// continuation.
///
/// Retry decisions are never taken at this layer: the page flags are always
/// restored to a safely retryable state first (re-dirtied for failed writes,
/// left not-uptodate for failed reads) and the caller decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// No I/O descriptor could be allocated. The operation did not start,
    /// the page was restored for a later retry.
    ResourceExhausted,
    /// The underlying storage rejected a write. The page stays dirty so its
    /// content is not lost.
    DeviceWriteFailed { sector: u64 },
    /// The underlying storage rejected a read. The page stays not-uptodate.
    DeviceReadFailed { sector: u64 },
    /// The device abandoned the request before executing it, e.g. because
    /// it shut down with the request still queued.
    Aborted,
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::ResourceExhausted => write!(f, "could not allocate an i/o descriptor"),
            IoError::DeviceWriteFailed { sector } => {
                write!(f, "write error on swap device at sector {}", sector)
            }
            IoError::DeviceReadFailed { sector } => {
                write!(f, "read error on swap device at sector {}", sector)
            }
            IoError::Aborted => write!(f, "request abandoned before it reached the device"),
        }
    }
}
