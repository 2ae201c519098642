//! The triple store: ownership root and pattern-query surface.
//!
//! A [`TripleStore`] owns its interner, its per-predicate indices, the
//! object-type column, and the multi-object index. Nothing in it is global
//! and nothing in it locks: one owner serializes mutation, and read-only
//! operations against a quiesced store may run from many threads at once.
//!
//! Insertion is atomic at the granularity of one triple. Every growth a
//! call might need is staged with `try_reserve` before the first write, so
//! an allocation failure returns with the store in its pre-call state.

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tern_util::bitvec::WORD_BITS;
use tern_util::index_vec::{Idx, IndexVec};
use tern_util::{BitVec, ReserveError};

use crate::error::{Result, StoreError};
use crate::id::Id;
use crate::index::PredicateTable;
use crate::intern::{Interner, InternerStats};
use crate::multi::MultiObjectIndex;
use crate::telemetry::{ObserverSpan, Operation, SpanObserver};

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// The RDF `type` predicate IRI; the default designated type predicate.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

fn default_max_triples() -> u32 {
    4096
}

fn default_max_predicates() -> u32 {
    64
}

fn default_max_objects() -> u32 {
    4096
}

/// Construction options for a [`TripleStore`].
///
/// The `max_*` fields are capacity hints: with `fixed_capacity` left off
/// they only pre-size allocations, and the store grows past them on
/// demand. With `fixed_capacity` set, exceeding a hint surfaces
/// [`StoreError::Overflow`] and the store stays unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Expected number of distinct triples.
    #[serde(default = "default_max_triples")]
    pub max_triples: u32,

    /// Expected number of distinct predicates.
    #[serde(default = "default_max_predicates")]
    pub max_predicates: u32,

    /// Expected number of distinct terms (subjects and objects share the
    /// interner's id space).
    #[serde(default = "default_max_objects")]
    pub max_objects: u32,

    /// Treat the hints as hard bounds instead of pre-sizing.
    #[serde(default)]
    pub fixed_capacity: bool,

    /// IRI to intern at construction as the designated "type" predicate,
    /// typically [`RDF_TYPE`]. Interning it first shifts user term ids by
    /// one, so the default leaves designation to
    /// [`TripleStore::designate_type_predicate`]. The predicate is never
    /// discovered by string content at insertion time.
    #[serde(default)]
    pub type_predicate_iri: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_triples: default_max_triples(),
            max_predicates: default_max_predicates(),
            max_objects: default_max_objects(),
            fixed_capacity: false,
            type_predicate_iri: None,
        }
    }
}

/// One pattern of a batched ask. Only `o` may be the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    /// Subject id; must be concrete.
    pub s: Id,
    /// Predicate id; must be concrete.
    pub p: Id,
    /// Object id; the wildcard means "any object for `(s, p)`".
    pub o: Id,
}

impl TriplePattern {
    /// Builds a pattern.
    pub fn new(s: Id, p: Id, o: Id) -> Self {
        Self { s, p, o }
    }
}

/// Summary counters for one store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreStats {
    /// Distinct triples recorded.
    pub triples: u64,
    /// Predicates with at least one recorded triple.
    pub active_predicates: usize,
    /// `(p, s)` pairs that spilled into the multi-object index.
    pub spilled_pairs: usize,
    /// Interner counters.
    pub interner: InternerStats,
}

/// In-memory triple store with constant-time pattern lookup.
pub struct TripleStore {
    options: StoreOptions,
    pub(crate) interner: Interner,
    pub(crate) predicates: PredicateTable,
    /// OT column: object of the first type-predicate triple per subject.
    pub(crate) object_types: IndexVec<Id, Id>,
    pub(crate) multi: MultiObjectIndex,
    /// Class id -> every (transitive) superclass, supplied by a higher
    /// layer. Absent means direct-type checks only.
    pub(crate) subclass_closure: Option<FxIndexMap<Id, Vec<Id>>>,
    pub(crate) observer: Option<Box<dyn SpanObserver>>,
    type_predicate: Id,
    triples: u64,
}

#[inline]
fn concrete(id: Id, context: &'static str) -> Result<()> {
    if id.is_wildcard() {
        Err(StoreError::InvalidWildcard { context })
    } else {
        Ok(())
    }
}

impl TripleStore {
    /// Creates a store with default options.
    pub fn new() -> Result<Self> {
        Self::with_options(StoreOptions::default())
    }

    /// Creates a store sized by `options`. When `type_predicate_iri` is
    /// set, it is interned first so the type predicate has an id before
    /// the first triple arrives.
    pub fn with_options(options: StoreOptions) -> Result<Self> {
        let mut interner = Interner::with_capacity(options.max_objects as usize)?;
        let type_predicate = match &options.type_predicate_iri {
            Some(iri) => interner.intern(iri)?,
            None => Id::WILDCARD,
        };
        let predicates = PredicateTable::with_capacity(options.max_predicates as usize)?;
        let object_types = IndexVec::with_capacity(options.max_objects as usize)?;
        let multi = MultiObjectIndex::with_capacity((options.max_triples as usize / 4).max(8))?;

        tracing::debug!(
            max_triples = options.max_triples,
            max_predicates = options.max_predicates,
            max_objects = options.max_objects,
            fixed = options.fixed_capacity,
            "store created"
        );

        Ok(Self {
            options,
            interner,
            predicates,
            object_types,
            multi,
            subclass_closure: None,
            observer: None,
            type_predicate,
            triples: 0,
        })
    }

    /// The options the store was built with.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Id of the designated type predicate, if one has been designated.
    #[inline]
    pub fn type_predicate(&self) -> Option<Id> {
        if self.type_predicate.is_wildcard() {
            None
        } else {
            Some(self.type_predicate)
        }
    }

    /// Designates `p` as the "type" predicate feeding the object-type
    /// column that accelerates class-membership checks.
    ///
    /// Replaces any previous designation and rebuilds the column: for
    /// every subject already carrying a `p` triple, the first-recorded
    /// object becomes its type.
    pub fn designate_type_predicate(&mut self, p: Id) -> Result<()> {
        concrete(p, "type predicate must be concrete")?;
        let mut column: IndexVec<Id, Id> = IndexVec::new();
        if let Some(row) = self.predicates.row(p) {
            for bit in row.subjects.iter_ones() {
                column.try_ensure_len(bit + 1, Id::WILDCARD)?;
                column[Id::from_usize(bit)] = row.primary_object(Id::from_usize(bit));
            }
        }
        self.type_predicate = p;
        self.object_types = column;
        Ok(())
    }

    /// Number of distinct triples recorded.
    #[inline]
    pub fn len(&self) -> u64 {
        self.triples
    }

    /// True if no triple has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triples == 0
    }

    /// Number of predicates with at least one recorded triple.
    pub fn predicate_count(&self) -> usize {
        self.predicates.active_count()
    }

    /// Registers the span observer notified around every operation.
    pub fn set_observer(&mut self, observer: Box<dyn SpanObserver>) {
        self.observer = Some(observer);
    }

    /// Removes the span observer.
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Installs a subclass closure: for each class id, every class it is
    /// transitively a subclass of. Consulted by class-membership checks;
    /// replaces any previously registered closure.
    pub fn register_subclass_closure<I, A>(&mut self, closure: I)
    where
        I: IntoIterator<Item = (Id, A)>,
        A: IntoIterator<Item = Id>,
    {
        let map: FxIndexMap<Id, Vec<Id>> = closure
            .into_iter()
            .map(|(class, ancestors)| (class, ancestors.into_iter().collect()))
            .collect();
        self.subclass_closure = Some(map);
    }

    /// Interns a term, returning its dense id. Equal strings always map
    /// to equal ids; the id is never the wildcard.
    pub fn intern(&mut self, string: &str) -> Result<Id> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::Intern);
        if self.options.fixed_capacity
            && !string.is_empty()
            && self.interner.len() >= self.options.max_objects as usize
            && self.interner.get(string).is_none()
        {
            return Err(StoreError::Overflow {
                what: "fixed term capacity",
            });
        }
        self.interner.intern(string)
    }

    /// Resolves an id back to its interned string.
    pub fn resolve(&self, id: Id) -> Result<&str> {
        self.interner.resolve(id)
    }

    /// Looks an already-interned term up without interning it.
    pub fn lookup(&self, string: &str) -> Option<Id> {
        self.interner.get(string)
    }

    /// Records the triple `(s, p, o)`. Re-inserting an existing triple is
    /// a no-op; all three ids must be concrete.
    ///
    /// Ids beyond current index capacity are legal and grow the relevant
    /// dimension, preserving earlier contents. On any failure the store is
    /// left in its pre-call state.
    pub fn add_triple(&mut self, s: Id, p: Id, o: Id) -> Result<()> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::AddTriple);
        concrete(s, "triple subject must be concrete")?;
        concrete(p, "triple predicate must be concrete")?;
        concrete(o, "triple object must be concrete")?;
        self.check_fixed_limits(s, p, o)?;

        // Stage all growth first: the row, its columns, and (for type
        // triples) the OT column. After this block no write can fail.
        self.predicates.ensure_row(p)?;
        self.predicates.row_mut(p).reserve_subject(s)?;
        if p == self.type_predicate {
            self.object_types.try_ensure_len(s.index() + 1, Id::WILDCARD)?;
        }

        let current = self
            .predicates
            .row(p)
            .map(|row| row.primary_object(s))
            .unwrap_or(Id::WILDCARD);

        let newly = if current.is_wildcard() {
            self.predicates.row_mut(p).record(s, o)?;
            true
        } else if current == o {
            false
        } else {
            self.multi.add(p, s, current, o)?
        };

        if p == self.type_predicate {
            let slot = &mut self.object_types[s];
            if slot.is_wildcard() {
                *slot = o;
            }
        }

        if newly {
            self.triples += 1;
            tracing::trace!(%s, %p, %o, "triple recorded");
        }
        Ok(())
    }

    /// Constant-time existence check for `(s, p, o)`.
    ///
    /// `s` and `p` must be concrete; the wildcard as `o` asks whether any
    /// object exists for `(s, p)`. Unknown ids are a normal `false`.
    pub fn ask(&self, s: Id, p: Id, o: Id) -> Result<bool> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::Ask);
        concrete(s, "ask subject must be concrete")?;
        concrete(p, "ask predicate must be concrete")?;
        Ok(self.holds(s, p, o))
    }

    /// Infallible convenience over [`TripleStore::ask`] for fully concrete
    /// triples: any wildcard argument reads as "not stored".
    pub fn contains(&self, s: Id, p: Id, o: Id) -> bool {
        if s.is_wildcard() || p.is_wildcard() || o.is_wildcard() {
            return false;
        }
        self.holds(s, p, o)
    }

    /// Evaluates a batch of ask patterns, four lanes at a time.
    ///
    /// Results are element-wise identical to issuing [`TripleStore::ask`]
    /// per pattern. An empty batch is malformed.
    pub fn ask_batch(&self, patterns: &[TriplePattern]) -> Result<Vec<bool>> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::AskBatch);
        if patterns.is_empty() {
            return Err(StoreError::Inconsistent {
                reason: "empty pattern batch",
            });
        }
        for pattern in patterns {
            concrete(pattern.s, "ask subject must be concrete")?;
            concrete(pattern.p, "ask predicate must be concrete")?;
        }

        let mut results = Vec::new();
        results
            .try_reserve_exact(patterns.len())
            .map_err(|e| ReserveError::exhausted("ask results", e))
            .map_err(StoreError::OutOfMemory)?;

        let split = patterns.len() - patterns.len() % 4;
        let (grouped, tail) = patterns.split_at(split);

        for group in grouped.chunks_exact(4) {
            // Group the memory traffic per step: four subject words, four
            // masks, then the four object comparisons.
            let mut words = [0u64; 4];
            let mut masks = [0u64; 4];
            for (lane, pattern) in group.iter().enumerate() {
                let bit = pattern.s.index();
                words[lane] = self
                    .predicates
                    .row(pattern.p)
                    .map(|row| row.subjects.word(bit / WORD_BITS))
                    .unwrap_or(0);
                masks[lane] = 1u64 << (bit % WORD_BITS);
            }

            let mut present = [false; 4];
            for lane in 0..4 {
                present[lane] = words[lane] & masks[lane] != 0;
            }

            for (lane, pattern) in group.iter().enumerate() {
                let hit = present[lane]
                    && (pattern.o.is_wildcard()
                        || self
                            .predicates
                            .row(pattern.p)
                            .is_some_and(|row| row.primary_object(pattern.s) == pattern.o)
                        || self.multi.contains(pattern.p, pattern.s, pattern.o));
                results.push(hit);
            }
        }
        for pattern in tail {
            results.push(self.holds(pattern.s, pattern.p, pattern.o));
        }
        Ok(results)
    }

    /// Enumerates the objects recorded for `(s, p)`: the primary object
    /// first, then the remaining spilled objects.
    ///
    /// The iterator is finite and restartable; calling this again yields
    /// the same sequence. The observer span covers the lookup, not the
    /// consumption of the iterator.
    pub fn get_objects(&self, p: Id, s: Id) -> Result<Objects<'_>> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::GetObjects);
        concrete(p, "enumeration predicate must be concrete")?;
        concrete(s, "enumeration subject must be concrete")?;

        const EMPTY: &[Id] = &[];
        let primary = self
            .predicates
            .row(p)
            .map(|row| row.primary_object(s))
            .unwrap_or(Id::WILDCARD);
        if primary.is_wildcard() {
            return Ok(Objects {
                primary: None,
                rest: EMPTY.iter(),
                skip: Id::WILDCARD,
            });
        }
        let rest = self
            .multi
            .get(p, s)
            .map(|set| set.as_slice())
            .unwrap_or(EMPTY)
            .iter();
        Ok(Objects {
            primary: Some(primary),
            rest,
            skip: primary,
        })
    }

    /// Materializes every subject `s` with a triple `(s, p, o)`, in
    /// ascending id order and without duplicates. The wildcard as `o`
    /// materializes the whole subject population of `p`.
    pub fn materialize_subjects(&self, p: Id, o: Id) -> Result<Vec<Id>> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::MaterializeSubjects);
        concrete(p, "materialization predicate must be concrete")?;

        let Some(row) = self.predicates.row(p) else {
            return Ok(Vec::new());
        };
        let mut subjects = Vec::new();
        subjects
            .try_reserve_exact(row.subjects.count_ones())
            .map_err(|e| ReserveError::exhausted("materialized subjects", e))
            .map_err(StoreError::OutOfMemory)?;

        for bit in row.subjects.iter_ones() {
            let s = Id::from_usize(bit);
            if o.is_wildcard() || row.primary_object(s) == o || self.multi.contains(p, s, o) {
                subjects.push(s);
            }
        }
        Ok(subjects)
    }

    /// The subjects matching `(*, p, o)` as a bit vector, for consumers
    /// that combine predicates themselves with [`BitVec::and`]/[`BitVec::or`].
    pub fn subject_vector(&self, p: Id, o: Id) -> Result<BitVec> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::SubjectVector);
        concrete(p, "subject-vector predicate must be concrete")?;

        let Some(row) = self.predicates.row(p) else {
            return Ok(BitVec::new());
        };
        if o.is_wildcard() {
            return Ok(row.subjects.clone());
        }
        let mut vector = BitVec::with_bit_capacity(row.subjects.bit_capacity())?;
        for bit in row.subjects.iter_ones() {
            let s = Id::from_usize(bit);
            if row.primary_object(s) == o || self.multi.contains(p, s, o) {
                vector.set(bit)?;
            }
        }
        Ok(vector)
    }

    /// Summary counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            triples: self.triples,
            active_predicates: self.predicates.active_count(),
            spilled_pairs: self.multi.spilled_pairs(),
            interner: self.interner.stats(),
        }
    }

    /// The raw existence check shared by every query path. Callers have
    /// validated that `s` and `p` are concrete.
    pub(crate) fn holds(&self, s: Id, p: Id, o: Id) -> bool {
        let Some(row) = self.predicates.row(p) else {
            return false;
        };
        if !row.has_subject(s) {
            return false;
        }
        o.is_wildcard() || row.primary_object(s) == o || self.multi.contains(p, s, o)
    }

    /// Hard-bound enforcement for fixed-capacity stores. A duplicate of a
    /// stored triple stays a no-op even at the triple limit.
    fn check_fixed_limits(&self, s: Id, p: Id, o: Id) -> Result<()> {
        if !self.options.fixed_capacity {
            return Ok(());
        }
        if p.as_u32() > self.options.max_predicates {
            return Err(StoreError::Overflow {
                what: "fixed predicate capacity",
            });
        }
        if s.as_u32() > self.options.max_objects || o.as_u32() > self.options.max_objects {
            return Err(StoreError::Overflow {
                what: "fixed term capacity",
            });
        }
        if self.triples >= u64::from(self.options.max_triples) && !self.holds(s, p, o) {
            return Err(StoreError::Overflow {
                what: "fixed triple capacity",
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for TripleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("TripleStore")
            .field("triples", &stats.triples)
            .field("active_predicates", &stats.active_predicates)
            .field("spilled_pairs", &stats.spilled_pairs)
            .field("strings", &stats.interner.strings)
            .finish()
    }
}

/// Lazy enumeration of the objects for one `(s, p)` pair.
///
/// Yields the primary object first, then the remaining members of the
/// spilled set, skipping the primary so nothing repeats.
#[derive(Debug, Clone)]
pub struct Objects<'a> {
    primary: Option<Id>,
    rest: std::slice::Iter<'a, Id>,
    skip: Id,
}

impl Iterator for Objects<'_> {
    type Item = Id;

    fn next(&mut self) -> Option<Id> {
        if let Some(first) = self.primary.take() {
            return Some(first);
        }
        for &object in self.rest.by_ref() {
            if object != self.skip {
                return Some(object);
            }
        }
        None
    }
}
