use super::{
    assert_page_content, fill_page, get_block_manager, get_byte_manager, new_locked_page,
    wait_until, zero_page,
};
use crate::PageFlag;

#[test]
fn test_block_round_trip() {
    super::init_test_logging();
    let (manager, device) = get_block_manager("test_block_round_trip", 4);

    let page = new_locked_page(device, 1);
    fill_page(&page, 42);
    page.set_flag(PageFlag::Dirty);

    manager.write_out(&page).unwrap();

    // asynchronous write-back: the page came back unlocked right away, the
    // transfer is confirmed once writeback clears
    assert!(!page.test_flag(PageFlag::Locked));
    wait_until("write-back finished", || {
        !page.test_flag(PageFlag::Writeback)
    });
    assert!(!page.test_flag(PageFlag::Error));

    // now fault it back in
    page.lock();
    zero_page(&page);
    manager.read_in(&page).unwrap();

    wait_until("read-in finished", || !page.test_flag(PageFlag::Locked));
    assert!(page.test_flag(PageFlag::Uptodate));
    assert!(!page.test_flag(PageFlag::Error));
    assert_page_content(&page, 42);

    assert_eq!(manager.counters().write_outs(), 1);
    assert_eq!(manager.counters().read_ins(), 1);
}

#[test]
fn test_byte_round_trip() {
    let (manager, device) = get_byte_manager(4);

    let page = new_locked_page(device, 2);
    fill_page(&page, 7);
    page.set_flag(PageFlag::Dirty);

    manager.write_out(&page).unwrap();

    // synchronous path: everything is settled on return
    assert!(!page.test_flag(PageFlag::Locked));
    assert!(!page.test_flag(PageFlag::Writeback));

    page.lock();
    zero_page(&page);
    manager.read_in(&page).unwrap();

    assert!(!page.test_flag(PageFlag::Locked));
    assert!(page.test_flag(PageFlag::Uptodate));
    assert_page_content(&page, 7);

    assert_eq!(manager.counters().write_outs(), 1);
    assert_eq!(manager.counters().read_ins(), 1);
}

#[test]
fn test_block_round_trip_many_pages() {
    const PAGES: usize = 16;
    let (manager, device) = get_block_manager("test_block_round_trip_many_pages", PAGES);

    let pages: Vec<_> = (0..PAGES)
        .map(|offset| {
            let page = new_locked_page(device, offset);
            fill_page(&page, offset as u8);
            page.set_flag(PageFlag::Dirty);
            page
        })
        .collect();

    for page in &pages {
        manager.write_out(page).unwrap();
    }
    for page in &pages {
        wait_until("write-back finished", || {
            !page.test_flag(PageFlag::Writeback)
        });
        assert!(!page.test_flag(PageFlag::Error));
    }

    for page in &pages {
        page.lock();
        zero_page(page);
        manager.read_in(page).unwrap();
    }

    for (offset, page) in pages.iter().enumerate() {
        wait_until("read-in finished", || !page.test_flag(PageFlag::Locked));
        assert!(page.test_flag(PageFlag::Uptodate));
        assert_page_content(page, offset as u8);
    }

    assert_eq!(manager.counters().write_outs(), PAGES);
    assert_eq!(manager.counters().read_ins(), PAGES);

    manager.counters().reset();
    assert_eq!(manager.counters().write_outs(), 0);
    assert_eq!(manager.counters().read_ins(), 0);
}

#[test]
fn test_mixed_devices_dispatch_by_entry() {
    // one manager, both backend kinds; each page ends up on its own device
    let mut manager = crate::SwapManager::new(super::no_stale_pages);
    let block = manager.register_device(Box::new(
        crate::modules::swap_backend::BlockSwapBackend::new(
            crate::modules::block_device::test::get_test_device("test_mixed_devices", 4),
            crate::SwapConfig::default(),
        ),
    ));
    let byte = manager.register_device(Box::new(
        crate::modules::swap_backend::ByteSwapBackend::new(
            crate::modules::byte_store::test::get_test_store(4),
        ),
    ));

    let block_page = new_locked_page(block, 0);
    fill_page(&block_page, 0xb1);
    let byte_page = new_locked_page(byte, 0);
    fill_page(&byte_page, 0xe2);

    manager.write_out(&block_page).unwrap();
    manager.write_out(&byte_page).unwrap();
    wait_until("write-back finished", || {
        !block_page.test_flag(PageFlag::Writeback)
    });

    for page in [&block_page, &byte_page] {
        page.lock();
        zero_page(page);
        manager.read_in(page).unwrap();
        wait_until("read-in finished", || !page.test_flag(PageFlag::Locked));
    }

    assert_page_content(&block_page, 0xb1);
    assert_page_content(&byte_page, 0xe2);
}
