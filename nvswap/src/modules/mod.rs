pub mod block_device;
pub mod byte_store;
pub mod swap_backend;
