/// Configuration for a block swap backend.
#[derive(Debug, Clone, Copy)]
pub struct SwapConfig {
    /// Upper bound of concurrently in-flight single-page I/O descriptors.
    /// Once the budget is used up, further operations fail with
    /// [`IoError::ResourceExhausted`](crate::IoError::ResourceExhausted)
    /// until a completion returns a descriptor.
    pub max_inflight_io: usize,
}

impl Default for SwapConfig {
    fn default() -> Self {
        SwapConfig { max_inflight_io: 64 }
    }
}
