mod anon;
mod mmap;

pub use anon::AnonByteStore;
pub use mmap::MmapByteStore;

use core::ptr::NonNull;

use crate::page::PAGE_SIZE;

/// A byte-addressable backing store: a directly mapped region of
/// `slot_count` page-sized slots, accessed by plain memory copy instead of
/// block I/O.
///
/// Implementations hand out the base address of the mapping; all slot
/// arithmetic stays in [`ByteStoreModule::slot_addr`]. The region must stay
/// mapped and stable for the lifetime of the store.
pub trait ByteStoreModule {
    /// Capacity of the store in page-sized slots
    fn slot_count(&self) -> usize;

    /// Base address of the mapped region
    fn base(&self) -> NonNull<u8>;

    /// Direct address of a physical slot.
    ///
    /// An out-of-range slot means the caller's slot map is corrupted, which
    /// is fatal here rather than an error: continuing would scribble over
    /// foreign slots.
    fn slot_addr(&self, slot: usize) -> NonNull<u8> {
        assert!(
            slot < self.slot_count(),
            "slot {} out of range (store has {} slots)",
            slot,
            self.slot_count()
        );

        // Safety: slot is in range, the region spans slot_count * PAGE_SIZE
        unsafe { NonNull::new_unchecked(self.base().as_ptr().add(slot * PAGE_SIZE)) }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::{AnonByteStore, ByteStoreModule};
    use crate::page::PAGE_SIZE;

    pub(crate) fn get_test_store(slot_count: usize) -> AnonByteStore {
        AnonByteStore::new(slot_count).unwrap()
    }

    fn gen_number(slot: usize, i: usize) -> u8 {
        (slot * 13 + i * 3 + (i % 11) * 51) as u8
    }

    /// every slot holds its own data, no bleeding between neighbours
    pub(super) fn test_byte_store_slot_isolation<S: ByteStoreModule>(store: S) {
        let slots = store.slot_count();

        for slot in 0..slots {
            let addr = store.slot_addr(slot).as_ptr();
            for i in 0..PAGE_SIZE {
                unsafe { addr.add(i).write(gen_number(slot, i)) };
            }
        }

        for slot in 0..slots {
            let addr = store.slot_addr(slot).as_ptr();
            for i in 0..PAGE_SIZE {
                assert_eq!(
                    unsafe { addr.add(i).read() },
                    gen_number(slot, i),
                    "slot {} byte {} was clobbered",
                    slot,
                    i
                );
            }
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_slot_addr_rejects_out_of_range() {
        let store = get_test_store(2);
        store.slot_addr(2);
    }
}
