use std::{
    thread,
    time::{Duration, Instant},
};

use crate::modules::block_device::test::get_test_device;
use crate::modules::byte_store::test::get_test_store;
use crate::modules::swap_backend::{BlockSwapBackend, ByteSwapBackend};
use crate::{Page, PageFlag, PageRef, SwapConfig, SwapDeviceId, SwapEntry, SwapManager, PAGE_SIZE};

mod round_trip;

/// never treat a page as a stale swap cache entry
pub(crate) fn no_stale_pages(_page: &Page) -> bool {
    false
}

pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn get_block_manager(
    test_name: &str,
    page_capacity: usize,
) -> (SwapManager, SwapDeviceId) {
    let mut manager = SwapManager::new(no_stale_pages);
    let backend = BlockSwapBackend::new(
        get_test_device(test_name, page_capacity),
        SwapConfig::default(),
    );
    let device = manager.register_device(Box::new(backend));

    (manager, device)
}

pub(crate) fn get_byte_manager(slot_count: usize) -> (SwapManager, SwapDeviceId) {
    let mut manager = SwapManager::new(no_stale_pages);
    let backend = ByteSwapBackend::new(get_test_store(slot_count));
    let device = manager.register_device(Box::new(backend));

    (manager, device)
}

/// deterministic per-page test pattern
pub(crate) fn fill_page(page: &PageRef, seed: u8) {
    // the filling "thread" owns the page here, tests lock before filling
    assert!(page.test_flag(PageFlag::Locked));

    let mut mapping = unsafe { page.map() };
    for i in 0..PAGE_SIZE {
        mapping[i] = seed.wrapping_add((i % 253) as u8);
    }
}

pub(crate) fn assert_page_content(page: &PageRef, seed: u8) {
    let mapping = unsafe { page.map() };
    for i in 0..PAGE_SIZE {
        assert_eq!(
            mapping[i],
            seed.wrapping_add((i % 253) as u8),
            "content mismatch at byte {}",
            i
        );
    }
}

pub(crate) fn zero_page(page: &PageRef) {
    assert!(page.test_flag(PageFlag::Locked));

    let mut mapping = unsafe { page.map() };
    mapping.fill(0);
}

/// Polls until `condition` holds; asynchronous completions have no other
/// synchronization surface than the page flags they mutate.
pub(crate) fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting until {}", what);
        thread::yield_now();
    }
}

pub(crate) fn new_locked_page(device: SwapDeviceId, offset: usize) -> PageRef {
    let page = Page::new(SwapEntry::new(device, offset));
    page.lock();
    page
}
