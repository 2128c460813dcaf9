mod counters;
mod io_error;
mod page;
mod slot_aging;
mod swap_config;
mod swap_entry;
mod swap_manager;

#[cfg(test)]
mod test;

pub use counters::SwapCounters;
pub use io_error::IoError;
pub use page::{Page, PageFlag, PageMapping, PageRef, PAGE_SHIFT, PAGE_SIZE};
pub use slot_aging::SlotAging;
pub use swap_config::SwapConfig;
pub use swap_entry::{SwapDeviceId, SwapEntry, SECTOR_SHIFT, SECTOR_SIZE};
pub use swap_manager::SwapManager;
pub mod modules;
