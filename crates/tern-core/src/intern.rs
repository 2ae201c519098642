//! String interning for IRIs and literals.
//!
//! The interner maps byte-equal strings to the same dense [`Id`] and holds
//! the reverse mapping. It is owned by one store; there is no process-wide
//! table. Two structures cooperate:
//!
//! - a **byte arena**: one `String` holding every interned string
//!   back-to-back, plus an end-offset per id, so `resolve` is two loads and
//!   a slice;
//! - an **open-addressed slot table** keyed by the string hash: each slot
//!   is a `(hash, id)` pair, probed linearly over a power-of-two capacity
//!   and rebuilt at double size past a 0.7 load factor.
//!
//! The hash is `FxHasher`, deterministic run to run, so identical intern
//! sequences produce identical table layouts. The first id handed out is
//! `1`; id `0` is the reserved wildcard and is never returned.

use std::hash::Hasher;

use rustc_hash::FxHasher;
use tern_util::ReserveError;

use crate::error::{Result, StoreError};
use crate::id::Id;

/// Initial slot-table capacity. Must be a power of two.
const INITIAL_SLOTS: usize = 16;

/// One slot of the dedup table. `id == Id::WILDCARD` marks a vacant slot,
/// so the full hash can be stored without a separate occupancy bit.
#[derive(Clone, Copy, Debug)]
struct Slot {
    hash: u64,
    id: Id,
}

const VACANT: Slot = Slot {
    hash: 0,
    id: Id::WILDCARD,
};

/// Counters kept by the interner for profiling.
///
/// `probe_steps` counts slots stepped over past the home slot; a growing
/// ratio of steps to lookups means the table is resizing too late.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InternerStats {
    /// Number of distinct strings interned.
    pub strings: usize,
    /// Current slot-table capacity.
    pub table_slots: usize,
    /// Interns that found an existing id.
    pub hits: u64,
    /// Interns that assigned a fresh id.
    pub misses: u64,
    /// Linear-probe steps taken past the home slot.
    pub probe_steps: u64,
}

impl InternerStats {
    /// Occupied fraction of the slot table.
    pub fn load_factor(&self) -> f64 {
        if self.table_slots == 0 {
            0.0
        } else {
            self.strings as f64 / self.table_slots as f64
        }
    }
}

/// A store-owned string interner.
pub struct Interner {
    slots: Vec<Slot>,
    /// Every interned string, concatenated.
    arena: String,
    /// End offset in `arena` of the string with id `i + 1`.
    ends: Vec<usize>,
    hits: u64,
    misses: u64,
    probe_steps: u64,
}

#[inline]
fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

impl Interner {
    /// Creates an interner sized for roughly `hint` distinct strings.
    pub fn with_capacity(hint: usize) -> Result<Self> {
        // Size the table so `hint` strings sit below the resize threshold.
        let table = (hint.max(8) * 10 / 7).next_power_of_two().max(INITIAL_SLOTS);
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(table)
            .map_err(|e| ReserveError::exhausted("interner slot table", e))?;
        slots.resize(table, VACANT);

        let mut ends = Vec::new();
        ends.try_reserve(hint)
            .map_err(|e| ReserveError::exhausted("interner offsets", e))?;

        Ok(Self {
            slots,
            arena: String::new(),
            ends,
            hits: 0,
            misses: 0,
            probe_steps: 0,
        })
    }

    /// Number of distinct strings interned.
    #[inline]
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// True if nothing has been interned yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Interns `string`, returning the existing id for a known string and
    /// a fresh dense id otherwise. Never returns [`Id::WILDCARD`].
    ///
    /// The empty string is refused: it is the string-level image of the
    /// reserved sentinel and interning it would hand the wildcard a
    /// resolvable meaning.
    pub fn intern(&mut self, string: &str) -> Result<Id> {
        if string.is_empty() {
            return Err(StoreError::InvalidWildcard {
                context: "cannot intern the empty string",
            });
        }

        let hash = hash_bytes(string.as_bytes());
        if let Some(id) = self.probe(hash, string) {
            self.hits += 1;
            return Ok(id);
        }
        self.misses += 1;

        let next = self.ends.len() + 1;
        if next > u32::MAX as usize {
            return Err(StoreError::Overflow {
                what: "identifier space",
            });
        }

        // Stage every allocation before the first write so a failure
        // leaves the interner exactly as it was.
        if (self.ends.len() + 1) * 10 > self.slots.len() * 7 {
            self.grow_table()?;
        }
        self.arena
            .try_reserve(string.len())
            .map_err(|e| StoreError::OutOfMemory(ReserveError::exhausted("interner arena", e)))?;
        self.ends
            .try_reserve(1)
            .map_err(|e| StoreError::OutOfMemory(ReserveError::exhausted("interner offsets", e)))?;

        let id = Id::from_u32(next as u32);
        self.arena.push_str(string);
        self.ends.push(self.arena.len());
        self.place(hash, id);
        Ok(id)
    }

    /// Looks up `string` without interning it.
    pub fn get(&self, string: &str) -> Option<Id> {
        if string.is_empty() {
            return None;
        }
        self.probe_readonly(hash_bytes(string.as_bytes()), string)
    }

    /// Resolves an id back to the string it was assigned for.
    ///
    /// The wildcard resolves to `InvalidWildcard`; an id never handed out
    /// resolves to `NotFound`.
    pub fn resolve(&self, id: Id) -> Result<&str> {
        if id.is_wildcard() {
            return Err(StoreError::InvalidWildcard {
                context: "cannot resolve the wildcard id",
            });
        }
        let index = (id.as_u32() - 1) as usize;
        if index >= self.ends.len() {
            return Err(StoreError::NotFound(id));
        }
        Ok(self.string_at(index))
    }

    /// Profiling counters.
    pub fn stats(&self) -> InternerStats {
        InternerStats {
            strings: self.ends.len(),
            table_slots: self.slots.len(),
            hits: self.hits,
            misses: self.misses,
            probe_steps: self.probe_steps,
        }
    }

    /// The string stored for 0-based storage index `index`.
    #[inline]
    fn string_at(&self, index: usize) -> &str {
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        &self.arena[start..self.ends[index]]
    }

    /// Probes for `string`, counting steps. Returns its id if present.
    fn probe(&mut self, hash: u64, string: &str) -> Option<Id> {
        let mask = self.slots.len() - 1;
        let mut index = (hash as usize) & mask;
        loop {
            let slot = self.slots[index];
            if slot.id.is_wildcard() {
                return None;
            }
            if slot.hash == hash && self.string_at((slot.id.as_u32() - 1) as usize) == string {
                return Some(slot.id);
            }
            self.probe_steps += 1;
            index = (index + 1) & mask;
        }
    }

    /// Probe without touching the counters, for read-only lookups.
    fn probe_readonly(&self, hash: u64, string: &str) -> Option<Id> {
        let mask = self.slots.len() - 1;
        let mut index = (hash as usize) & mask;
        loop {
            let slot = self.slots[index];
            if slot.id.is_wildcard() {
                return None;
            }
            if slot.hash == hash && self.string_at((slot.id.as_u32() - 1) as usize) == string {
                return Some(slot.id);
            }
            index = (index + 1) & mask;
        }
    }

    /// Writes `(hash, id)` into the first vacant slot of its probe chain.
    fn place(&mut self, hash: u64, id: Id) {
        let mask = self.slots.len() - 1;
        let mut index = (hash as usize) & mask;
        while !self.slots[index].id.is_wildcard() {
            index = (index + 1) & mask;
        }
        self.slots[index] = Slot { hash, id };
    }

    /// Rebuilds the slot table at double capacity.
    ///
    /// There are no deletions, so rehashing is a straight re-place of
    /// every occupied slot.
    fn grow_table(&mut self) -> Result<()> {
        let new_cap = self.slots.len() * 2;
        let mut new_slots = Vec::new();
        new_slots
            .try_reserve_exact(new_cap)
            .map_err(|e| StoreError::OutOfMemory(ReserveError::exhausted("interner slot table", e)))?;
        new_slots.resize(new_cap, VACANT);

        let mask = new_cap - 1;
        for slot in self.slots.iter().copied() {
            if slot.id.is_wildcard() {
                continue;
            }
            let mut index = (slot.hash as usize) & mask;
            while !new_slots[index].id.is_wildcard() {
                index = (index + 1) & mask;
            }
            new_slots[index] = slot;
        }
        tracing::debug!(slots = new_cap, strings = self.ends.len(), "interner table resized");
        self.slots = new_slots;
        Ok(())
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner")
            .field("strings", &self.ends.len())
            .field("table_slots", &self.slots.len())
            .field("arena_bytes", &self.arena.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(Slot, [u8; 16]);

    fn interner() -> Interner {
        Interner::with_capacity(8).unwrap()
    }

    #[test]
    fn intern_same_string_same_id() {
        let mut i = interner();
        let a = i.intern("ex:alice").unwrap();
        let b = i.intern("ex:alice").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn intern_different_strings_different_ids() {
        let mut i = interner();
        let a = i.intern("ex:alice").unwrap();
        let b = i.intern("ex:bob").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_dense_from_one() {
        let mut i = interner();
        assert_eq!(i.intern("a").unwrap(), Id::from_u32(1));
        assert_eq!(i.intern("b").unwrap(), Id::from_u32(2));
        assert_eq!(i.intern("a").unwrap(), Id::from_u32(1));
        assert_eq!(i.intern("c").unwrap(), Id::from_u32(3));
    }

    #[test]
    fn resolve_round_trips() {
        let mut i = interner();
        let id = i.intern("http://example.org/knows").unwrap();
        assert_eq!(i.resolve(id).unwrap(), "http://example.org/knows");
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let i = interner();
        assert!(matches!(
            i.resolve(Id::from_u32(99)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn resolve_wildcard_is_refused() {
        let i = interner();
        assert!(matches!(
            i.resolve(Id::WILDCARD),
            Err(StoreError::InvalidWildcard { .. })
        ));
    }

    #[test]
    fn empty_string_is_refused() {
        let mut i = interner();
        assert!(matches!(
            i.intern(""),
            Err(StoreError::InvalidWildcard { .. })
        ));
        assert_eq!(i.len(), 0);
    }

    #[test]
    fn get_does_not_intern() {
        let mut i = interner();
        assert_eq!(i.get("ex:alice"), None);
        let id = i.intern("ex:alice").unwrap();
        assert_eq!(i.get("ex:alice"), Some(id));
        assert_eq!(i.len(), 1);
    }

    #[test]
    fn survives_table_growth() {
        let mut i = interner();
        let ids: Vec<Id> = (0..500)
            .map(|n| i.intern(&format!("ex:node/{n}")).unwrap())
            .collect();

        for (n, id) in ids.iter().enumerate() {
            assert_eq!(i.resolve(*id).unwrap(), format!("ex:node/{n}"));
            assert_eq!(i.intern(&format!("ex:node/{n}")).unwrap(), *id);
        }
        assert_eq!(i.len(), 500);
    }

    #[test]
    fn identical_sequences_assign_identical_ids() {
        let words = ["ex:a", "ex:b", "ex:c", "ex:a", "ex:d"];
        let mut one = interner();
        let mut two = interner();
        let left: Vec<Id> = words.iter().map(|w| one.intern(w).unwrap()).collect();
        let right: Vec<Id> = words.iter().map(|w| two.intern(w).unwrap()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let mut i = interner();
        i.intern("ex:a").unwrap();
        i.intern("ex:a").unwrap();
        i.intern("ex:b").unwrap();

        let stats = i.stats();
        assert_eq!(stats.strings, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert!(stats.load_factor() > 0.0);
    }

    #[test]
    fn unicode_round_trips() {
        let mut i = interner();
        for s in ["ex:名前", "ex:🦀", "ex:Привет"] {
            let id = i.intern(s).unwrap();
            assert_eq!(i.resolve(id).unwrap(), s);
        }
    }
}
