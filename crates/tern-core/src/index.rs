//! Per-predicate indices: subject bit vector and primary-object column.
//!
//! Each predicate that has ever appeared in a triple owns a pair of dense
//! structures indexed by subject id:
//!
//! - the **subject vector**: bit `s` is set iff at least one triple
//!   `(s, p, *)` exists;
//! - the **primary column**: slot `s` holds the first object recorded for
//!   `(s, p)`, or the sentinel when none has been.
//!
//! The primary column is never overwritten once set, so it stays a valid
//! fast path for asks with a concrete object even after later objects
//! spill into the multi-object index.

use tern_util::index_vec::Idx;
use tern_util::{BitVec, IndexVec, ReserveResult};

use crate::id::Id;

/// Index pair for one predicate.
#[derive(Debug, Clone, Default)]
pub(crate) struct PredicateIndex {
    /// Subject bit vector (one bit per subject id).
    pub(crate) subjects: BitVec,
    /// First object recorded per subject; sentinel means none.
    primary: IndexVec<Id, Id>,
}

impl PredicateIndex {
    /// True iff some triple `(s, p, *)` exists.
    #[inline]
    pub(crate) fn has_subject(&self, s: Id) -> bool {
        self.subjects.test(s.index())
    }

    /// The first object recorded for `(s, p)`, or the sentinel.
    #[inline]
    pub(crate) fn primary_object(&self, s: Id) -> Id {
        self.primary.get_or(s, Id::WILDCARD)
    }

    /// Stages growth so that a following [`PredicateIndex::record`] for
    /// the same subject cannot allocate.
    pub(crate) fn reserve_subject(&mut self, s: Id) -> ReserveResult<()> {
        self.primary.try_ensure_len(s.index() + 1, Id::WILDCARD)?;
        self.subjects.reserve_bit(s.index())
    }

    /// Writes the primary object and subject bit for `(s, p)`.
    ///
    /// Callers must have staged capacity with `reserve_subject`.
    pub(crate) fn record(&mut self, s: Id, o: Id) -> ReserveResult<()> {
        debug_assert!(o.is_concrete());
        self.primary[s] = o;
        self.subjects.set(s.index())
    }
}

/// All predicate index pairs, addressed by predicate id.
///
/// Rows are default-empty until a triple mentions the predicate; growing
/// the table allocates only empty `Vec` headers, so sparse predicate id
/// spaces stay cheap.
#[derive(Debug, Default)]
pub(crate) struct PredicateTable {
    rows: IndexVec<Id, PredicateIndex>,
}

impl PredicateTable {
    pub(crate) fn with_capacity(predicates: usize) -> ReserveResult<Self> {
        Ok(Self {
            rows: IndexVec::with_capacity(predicates)?,
        })
    }

    /// The index pair for `p`, if any triple has mentioned it.
    #[inline]
    pub(crate) fn row(&self, p: Id) -> Option<&PredicateIndex> {
        self.rows.get(p)
    }

    /// Grows the table so `p` has a row.
    pub(crate) fn ensure_row(&mut self, p: Id) -> ReserveResult<()> {
        self.rows
            .try_ensure_len_with(p.index() + 1, PredicateIndex::default)
    }

    /// Mutable row for `p`. Callers must have called `ensure_row`.
    #[inline]
    pub(crate) fn row_mut(&mut self, p: Id) -> &mut PredicateIndex {
        &mut self.rows[p]
    }

    /// Number of predicates with at least one recorded triple.
    pub(crate) fn active_count(&self) -> usize {
        self.rows
            .iter_enumerated()
            .filter(|(_, row)| !row.subjects.is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> Id {
        Id::from_u32(n)
    }

    #[test]
    fn empty_row_reads_absent() {
        let row = PredicateIndex::default();
        assert!(!row.has_subject(id(3)));
        assert_eq!(row.primary_object(id(3)), Id::WILDCARD);
    }

    #[test]
    fn record_sets_bit_and_primary() {
        let mut row = PredicateIndex::default();
        row.reserve_subject(id(5)).unwrap();
        row.record(id(5), id(9)).unwrap();

        assert!(row.has_subject(id(5)));
        assert!(!row.has_subject(id(4)));
        assert_eq!(row.primary_object(id(5)), id(9));
    }

    #[test]
    fn growth_preserves_recorded_subjects() {
        let mut row = PredicateIndex::default();
        row.reserve_subject(id(1)).unwrap();
        row.record(id(1), id(2)).unwrap();
        row.reserve_subject(id(100_000)).unwrap();
        row.record(id(100_000), id(3)).unwrap();

        assert_eq!(row.primary_object(id(1)), id(2));
        assert_eq!(row.primary_object(id(100_000)), id(3));
    }

    #[test]
    fn table_rows_appear_on_demand() {
        let mut table = PredicateTable::default();
        assert!(table.row(id(2)).is_none());

        table.ensure_row(id(2)).unwrap();
        assert!(table.row(id(2)).is_some());
        assert_eq!(table.active_count(), 0);

        let row = table.row_mut(id(2));
        row.reserve_subject(id(1)).unwrap();
        row.record(id(1), id(7)).unwrap();
        assert_eq!(table.active_count(), 1);
    }
}
