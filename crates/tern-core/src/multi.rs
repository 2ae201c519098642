//! Multi-object index: the spill structure for `(predicate, subject)`
//! pairs that carry more than one object.
//!
//! Most pairs carry exactly one object and never touch this structure; the
//! primary column answers for them. On the second distinct object the pair
//! spills here: an open-addressed table keyed by the packed `(p, s)` pair
//! maps to a sorted small-vector of every object for the pair, including
//! the first. Four objects store inline before the set touches the heap.
//!
//! Key `0` marks a vacant slot. That encoding is sound because a packed
//! key always carries a nonzero predicate id in its upper half.

use std::hash::Hasher;

use rustc_hash::FxHasher;
use smallvec::SmallVec;
use tern_util::ReserveError;

use crate::error::{Result, StoreError};
use crate::id::Id;

/// All objects recorded for one spilled `(p, s)` pair, sorted ascending.
pub(crate) type ObjectSet = SmallVec<[Id; 4]>;

/// Initial slot-table capacity. Must be a power of two.
const INITIAL_SLOTS: usize = 16;

#[derive(Clone, Copy, Debug)]
struct PairSlot {
    /// Packed `(p, s)` key; `0` marks a vacant slot.
    key: u64,
    /// Index into the side table of object sets.
    set: u32,
}

const VACANT: PairSlot = PairSlot { key: 0, set: 0 };

#[inline]
fn pair_key(p: Id, s: Id) -> u64 {
    debug_assert!(p.is_concrete());
    (u64::from(p.as_u32()) << 32) | u64::from(s.as_u32())
}

#[inline]
fn hash_key(key: u64) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(key);
    hasher.finish()
}

/// Hash table from `(p, s)` pairs to their full object sets.
#[derive(Debug)]
pub(crate) struct MultiObjectIndex {
    slots: Vec<PairSlot>,
    sets: Vec<ObjectSet>,
}

impl MultiObjectIndex {
    /// Creates an index sized for roughly `hint` spilled pairs.
    pub(crate) fn with_capacity(hint: usize) -> Result<Self> {
        let table = (hint.max(8) * 10 / 7).next_power_of_two().max(INITIAL_SLOTS);
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(table)
            .map_err(|e| ReserveError::exhausted("multi-object table", e))?;
        slots.resize(table, VACANT);
        Ok(Self {
            slots,
            sets: Vec::new(),
        })
    }

    /// Number of `(p, s)` pairs that have spilled.
    #[inline]
    pub(crate) fn spilled_pairs(&self) -> usize {
        self.sets.len()
    }

    /// The full object set for `(p, s)`, if the pair has spilled.
    pub(crate) fn get(&self, p: Id, s: Id) -> Option<&ObjectSet> {
        let key = pair_key(p, s);
        let mask = self.slots.len() - 1;
        let mut index = (hash_key(key) as usize) & mask;
        loop {
            let slot = self.slots[index];
            if slot.key == 0 {
                return None;
            }
            if slot.key == key {
                return Some(&self.sets[slot.set as usize]);
            }
            index = (index + 1) & mask;
        }
    }

    /// True iff the pair has spilled and its set contains `o`.
    #[inline]
    pub(crate) fn contains(&self, p: Id, s: Id, o: Id) -> bool {
        match self.get(p, s) {
            Some(set) => set.binary_search(&o).is_ok(),
            None => false,
        }
    }

    /// Records object `o` for a pair whose primary slot already holds a
    /// different object `seed`.
    ///
    /// On the first spill for the pair, the set is created holding both
    /// `seed` and `o`. Returns whether `o` was new for the pair; repeated
    /// insertion of a known object is a no-op.
    pub(crate) fn add(&mut self, p: Id, s: Id, seed: Id, o: Id) -> Result<bool> {
        debug_assert!(seed.is_concrete() && o.is_concrete());

        let key = pair_key(p, s);
        if let Some(set_index) = self.find_set(key) {
            let set = &mut self.sets[set_index];
            return match set.binary_search(&o) {
                Ok(_) => Ok(false),
                Err(position) => {
                    set.try_reserve(1)
                        .map_err(|_| ReserveError::exhausted_untracked("object set"))
                        .map_err(StoreError::OutOfMemory)?;
                    set.insert(position, o);
                    Ok(true)
                }
            };
        }

        debug_assert_ne!(seed, o, "spill requires a second distinct object");

        // Stage growth before any write so failure leaves the index as is.
        if (self.sets.len() + 1) * 10 > self.slots.len() * 7 {
            self.grow_table()?;
        }
        self.sets
            .try_reserve(1)
            .map_err(|e| ReserveError::exhausted("multi-object sets", e))
            .map_err(StoreError::OutOfMemory)?;

        let mut set = ObjectSet::new();
        if seed < o {
            set.push(seed);
            set.push(o);
        } else {
            set.push(o);
            set.push(seed);
        }
        let set_index = self.sets.len() as u32;
        self.sets.push(set);
        self.place(key, set_index);
        tracing::trace!(pair = key, "pair spilled to multi-object index");
        Ok(true)
    }

    /// Probes for `key`, returning the set index if present.
    fn find_set(&self, key: u64) -> Option<usize> {
        let mask = self.slots.len() - 1;
        let mut index = (hash_key(key) as usize) & mask;
        loop {
            let slot = self.slots[index];
            if slot.key == 0 {
                return None;
            }
            if slot.key == key {
                return Some(slot.set as usize);
            }
            index = (index + 1) & mask;
        }
    }

    /// Writes a slot into the first vacancy of its probe chain.
    fn place(&mut self, key: u64, set: u32) {
        let mask = self.slots.len() - 1;
        let mut index = (hash_key(key) as usize) & mask;
        while self.slots[index].key != 0 {
            index = (index + 1) & mask;
        }
        self.slots[index] = PairSlot { key, set };
    }

    /// Rebuilds the slot table at double capacity.
    fn grow_table(&mut self) -> Result<()> {
        let new_cap = self.slots.len() * 2;
        let mut new_slots = Vec::new();
        new_slots
            .try_reserve_exact(new_cap)
            .map_err(|e| ReserveError::exhausted("multi-object table", e))
            .map_err(StoreError::OutOfMemory)?;
        new_slots.resize(new_cap, VACANT);

        let mask = new_cap - 1;
        for slot in self.slots.iter().copied() {
            if slot.key == 0 {
                continue;
            }
            let mut index = (hash_key(slot.key) as usize) & mask;
            while new_slots[index].key != 0 {
                index = (index + 1) & mask;
            }
            new_slots[index] = slot;
        }
        tracing::debug!(slots = new_cap, pairs = self.sets.len(), "multi-object table resized");
        self.slots = new_slots;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> Id {
        Id::from_u32(n)
    }

    fn index() -> MultiObjectIndex {
        MultiObjectIndex::with_capacity(8).unwrap()
    }

    #[test]
    fn absent_pair_reads_empty() {
        let moi = index();
        assert!(moi.get(id(1), id(2)).is_none());
        assert!(!moi.contains(id(1), id(2), id(3)));
    }

    #[test]
    fn first_spill_keeps_the_seed() {
        let mut moi = index();
        assert!(moi.add(id(1), id(2), id(3), id(4)).unwrap());

        let set = moi.get(id(1), id(2)).unwrap();
        assert_eq!(set.as_slice(), &[id(3), id(4)]);
        assert!(moi.contains(id(1), id(2), id(3)));
        assert!(moi.contains(id(1), id(2), id(4)));
        assert!(!moi.contains(id(1), id(2), id(5)));
    }

    #[test]
    fn sets_stay_sorted_and_deduplicated() {
        let mut moi = index();
        moi.add(id(1), id(2), id(9), id(5)).unwrap();
        assert!(moi.add(id(1), id(2), id(9), id(7)).unwrap());
        assert!(!moi.add(id(1), id(2), id(9), id(5)).unwrap());

        let set = moi.get(id(1), id(2)).unwrap();
        assert_eq!(set.as_slice(), &[id(5), id(7), id(9)]);
    }

    #[test]
    fn pairs_are_independent() {
        let mut moi = index();
        moi.add(id(1), id(2), id(3), id(4)).unwrap();
        moi.add(id(1), id(5), id(6), id(7)).unwrap();
        moi.add(id(8), id(2), id(3), id(9)).unwrap();

        assert_eq!(moi.spilled_pairs(), 3);
        assert!(moi.contains(id(1), id(2), id(4)));
        assert!(!moi.contains(id(1), id(2), id(7)));
        assert!(!moi.contains(id(8), id(2), id(4)));
    }

    #[test]
    fn survives_table_growth() {
        let mut moi = index();
        for n in 0..200u32 {
            moi.add(id(1), id(n + 2), id(1000 + n), id(2000 + n)).unwrap();
        }
        assert_eq!(moi.spilled_pairs(), 200);
        for n in 0..200u32 {
            assert!(moi.contains(id(1), id(n + 2), id(1000 + n)));
            assert!(moi.contains(id(1), id(n + 2), id(2000 + n)));
        }
    }
}
