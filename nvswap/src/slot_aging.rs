/*
 *  Copyright (C) 2025  Markus Elias Gerber
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

/// Marker in the reverse index for slots that were extracted from the heap
const NOT_IN_HEAP: u32 = u32::MAX;

/// Min-heap over the physical slots of a byte-addressable swap device,
/// ordered by per-slot write age.
///
/// `age[slot]` counts successful writes to `slot` and never decreases. The
/// heap itself is a flat array of slot indices; `pos[slot]` is the reverse
/// index mapping a slot to its current heap position, so a single slot can
/// be repositioned in O(log n) after its age changed, without scanning.
///
/// The root is always the least recently written slot, which makes it the
/// natural reuse candidate for a wear-leveling slot allocation policy
/// (that policy lives outside this crate and drives [`SlotAging::peek_min`],
/// [`SlotAging::extract_min`] and [`SlotAging::push`]).
pub struct SlotAging {
    age: Vec<u64>,
    heap: Vec<u32>,
    pos: Vec<u32>,
}

impl SlotAging {
    /// Creates the aging structure for a device with `slot_count` slots,
    /// all ages zero and all slots on the heap.
    pub fn new(slot_count: usize) -> Self {
        assert!(slot_count < NOT_IN_HEAP as usize, "slot count too large");

        SlotAging {
            age: vec![0; slot_count],
            heap: (0..slot_count as u32).collect(),
            pos: (0..slot_count as u32).collect(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.age.len()
    }

    /// Number of slots currently on the heap
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    pub fn age(&self, slot: usize) -> u64 {
        self.age[slot]
    }

    /// Records one successful write to `slot`: bumps its age exactly once
    /// and restores the heap order.
    pub fn record_write(&mut self, slot: usize) {
        self.age[slot] += 1;
        self.update(slot);
    }

    /// Re-establishes the heap property after the age of `slot` changed.
    ///
    /// An aged (just written) slot sifts toward the bottom, a slot whose key
    /// decreased would sift up. Runs in O(log n). Extracted slots are not on
    /// the heap and need no repositioning.
    pub fn update(&mut self, slot: usize) {
        let position = self.pos[slot];
        if position == NOT_IN_HEAP {
            return;
        }

        let position = self.sift_down(position as usize);
        self.sift_up(position);
    }

    /// Least recently written slot, if any slot is on the heap
    pub fn peek_min(&self) -> Option<usize> {
        self.heap.first().map(|&slot| slot as usize)
    }

    /// Removes and returns the least recently written slot.
    ///
    /// The slot stays out of the ordering until it is handed back via
    /// [`SlotAging::push`]; its age keeps counting in the meantime.
    pub fn extract_min(&mut self) -> Option<usize> {
        if self.heap.is_empty() {
            return None;
        }

        let min = self.heap.swap_remove(0);
        self.pos[min as usize] = NOT_IN_HEAP;

        if !self.heap.is_empty() {
            self.pos[self.heap[0] as usize] = 0;
            self.sift_down(0);
        }

        Some(min as usize)
    }

    /// Puts an extracted slot back on the heap.
    pub fn push(&mut self, slot: usize) {
        assert!(
            self.pos[slot] == NOT_IN_HEAP,
            "slot {} is already on the heap",
            slot
        );

        self.heap.push(slot as u32);
        self.pos[slot] = (self.heap.len() - 1) as u32;
        self.sift_up(self.heap.len() - 1);
    }

    /// Checks the min-heap property and the reverse index. Corruption here
    /// means an upstream bug, the write path never repairs it silently.
    pub fn is_consistent(&self) -> bool {
        for (position, &slot) in self.heap.iter().enumerate() {
            if self.pos[slot as usize] != position as u32 {
                return false;
            }

            for child in [2 * position + 1, 2 * position + 2] {
                if child < self.heap.len()
                    && self.age[self.heap[child] as usize] < self.age[slot as usize]
                {
                    return false;
                }
            }
        }

        true
    }

    fn key(&self, position: usize) -> u64 {
        self.age[self.heap[position] as usize]
    }

    fn swap_positions(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.pos[self.heap[a] as usize] = a as u32;
        self.pos[self.heap[b] as usize] = b as u32;
    }

    fn sift_up(&mut self, mut position: usize) -> usize {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.key(position) >= self.key(parent) {
                break;
            }

            self.swap_positions(position, parent);
            position = parent;
        }

        position
    }

    fn sift_down(&mut self, mut position: usize) -> usize {
        loop {
            let mut smallest = position;
            for child in [2 * position + 1, 2 * position + 2] {
                if child < self.heap.len() && self.key(child) < self.key(smallest) {
                    smallest = child;
                }
            }

            if smallest == position {
                return position;
            }

            self.swap_positions(position, smallest);
            position = smallest;
        }
    }
}

#[cfg(test)]
mod test {
    use super::{SlotAging, NOT_IN_HEAP};
    use rand::{rngs::SmallRng, RngCore, SeedableRng};

    #[test]
    fn test_initial_state() {
        let aging = SlotAging::new(8);
        assert_eq!(aging.slot_count(), 8);
        assert_eq!(aging.heap_len(), 8);
        assert!(aging.is_consistent());
        for slot in 0..8 {
            assert_eq!(aging.age(slot), 0);
        }
    }

    #[test]
    fn test_age_is_monotonic() {
        let mut aging = SlotAging::new(4);

        let mut last = 0;
        for _ in 0..100 {
            aging.record_write(1);
            assert!(aging.age(1) > last);
            last = aging.age(1);
        }
        assert_eq!(aging.age(1), 100);
    }

    #[test]
    fn test_heap_property_after_random_writes() {
        const SEED: u64 = 5446535461589659585;
        const SLOT_COUNT: usize = 64;

        let mut aging = SlotAging::new(SLOT_COUNT);
        let mut rand = SmallRng::seed_from_u64(SEED);

        for _ in 0..10_000 {
            let slot = (rand.next_u32() as usize) % SLOT_COUNT;
            aging.record_write(slot);
            assert!(aging.is_consistent(), "heap property lost after write");
        }
    }

    #[test]
    fn test_repeated_writes_keep_slot_away_from_root() {
        // device with 4 slots, write one of them three times
        let mut aging = SlotAging::new(4);
        for _ in 0..3 {
            aging.record_write(2);
        }

        assert_eq!(aging.age(2), 3);
        assert_ne!(aging.peek_min(), Some(2), "root must be an untouched slot");

        // the hot slot must come out last
        let mut order = vec![];
        while let Some(slot) = aging.extract_min() {
            order.push(slot);
        }
        assert_eq!(order.len(), 4);
        assert_eq!(order[3], 2);
    }

    #[test]
    fn test_extract_and_push_cycle() {
        let mut aging = SlotAging::new(3);

        let first = aging.extract_min().unwrap();
        assert_eq!(aging.heap_len(), 2);
        assert!(aging.is_consistent());

        // ages keep counting while the slot is off the heap
        aging.record_write(first);
        aging.record_write(first);
        assert_eq!(aging.age(first), 2);

        aging.push(first);
        assert_eq!(aging.heap_len(), 3);
        assert!(aging.is_consistent());

        // the re-inserted slot is now the hottest one and must not be root
        assert_ne!(aging.peek_min(), Some(first));
    }

    #[test]
    fn test_extract_min_orders_by_age() {
        let mut aging = SlotAging::new(5);
        let writes = [(0, 4), (1, 1), (2, 3), (3, 0), (4, 2)];
        for (slot, count) in writes {
            for _ in 0..count {
                aging.record_write(slot);
            }
        }

        let mut last_age = 0;
        while let Some(slot) = aging.extract_min() {
            assert!(aging.age(slot) >= last_age, "extraction out of age order");
            last_age = aging.age(slot);
        }
    }

    #[test]
    #[should_panic(expected = "already on the heap")]
    fn test_double_push_panics() {
        let mut aging = SlotAging::new(2);
        aging.push(0);
    }

    #[test]
    fn test_not_in_heap_marker_is_out_of_range() {
        // slot counts are bounded so the marker can never alias a position
        assert!(SlotAging::new(16).pos.iter().all(|&p| p != NOT_IN_HEAP));
    }
}
