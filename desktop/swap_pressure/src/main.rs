use std::{sync::Arc, thread, time::Duration};

use env_logger::{Builder, Env};
use rand::{rngs::SmallRng, RngCore, SeedableRng};

use nvswap::{
    modules::{
        block_device::FileBlockDevice,
        byte_store::MmapByteStore,
        swap_backend::{BlockSwapBackend, ByteSwapBackend},
    },
    Page, PageFlag, PageRef, SwapConfig, SwapManager, PAGE_SIZE, SECTOR_SIZE,
};

const BLOCK_PAGES: usize = 64;
const BYTE_SLOTS: usize = 64;
const ROUNDS: usize = 10;

fn wait_for_writeback(pages: &[PageRef]) {
    for page in pages {
        while page.test_flag(PageFlag::Writeback) {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!page.test_flag(PageFlag::Error), "write-back failed");
    }
}

fn main() {
    Builder::from_env(Env::default())
        .filter_level(log::LevelFilter::Info)
        .format_module_path(false)
        .init();

    let mut manager = SwapManager::new(|_| false);

    let block_device = manager.register_device(Box::new(BlockSwapBackend::new(
        FileBlockDevice::new(
            "/tmp/swap_pressure_block.data".to_string(),
            (BLOCK_PAGES * PAGE_SIZE / SECTOR_SIZE) as u64,
        )
        .unwrap(),
        SwapConfig::default(),
    )));

    let byte_backend = Arc::new(ByteSwapBackend::new(
        MmapByteStore::new("/tmp/swap_pressure_pmem.data".to_string(), BYTE_SLOTS).unwrap(),
    ));
    let byte_device = manager.register_device(Box::new(Arc::clone(&byte_backend)));

    let mut rand = SmallRng::seed_from_u64(0x5afe);

    let block_pages: Vec<_> = (0..BLOCK_PAGES)
        .map(|offset| Page::new(nvswap::SwapEntry::new(block_device, offset)))
        .collect();
    let byte_pages: Vec<_> = (0..BYTE_SLOTS)
        .map(|offset| Page::new(nvswap::SwapEntry::new(byte_device, offset)))
        .collect();

    for round in 0..ROUNDS {
        // memory pressure: push every page out...
        for page in block_pages.iter().chain(byte_pages.iter()) {
            page.lock();
            {
                let mut mapping = unsafe { page.map() };
                for byte in mapping.iter_mut() {
                    *byte = rand.next_u32() as u8;
                }
            }
            page.set_flag(PageFlag::Dirty);
            manager.write_out(page).unwrap();
        }
        wait_for_writeback(&block_pages);

        // ...and fault it all back in
        for page in block_pages.iter().chain(byte_pages.iter()) {
            page.lock();
            page.clear_flag(PageFlag::Uptodate);
            manager.read_in(page).unwrap();
            while page.test_flag(PageFlag::Locked) {
                thread::sleep(Duration::from_millis(1));
            }
            assert!(page.test_flag(PageFlag::Uptodate), "read-in failed");
        }

        log::info!(
            "round {}: {} write-outs, {} read-ins so far",
            round,
            manager.counters().write_outs(),
            manager.counters().read_ins()
        );
    }

    // make the persistent-memory side durable and inspect its wear
    byte_backend.store().persist().unwrap();
    byte_backend.with_aging(|aging| {
        let coldest = aging.peek_min().unwrap();
        println!(
            "coldest slot {} (age {}), next reuse candidate",
            coldest,
            aging.age(coldest)
        );
    });

    println!(
        "done: {} write-outs, {} read-ins",
        manager.counters().write_outs(),
        manager.counters().read_ins()
    );
}
