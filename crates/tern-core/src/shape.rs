//! Shape constraints: class membership, cardinality bounds, and batched
//! shape validation.
//!
//! All three constraints read the same structures the pattern queries
//! read, so a constraint check costs a handful of loads:
//!
//! - class membership reads the object-type column, falling back to the
//!   registered subclass closure when one is installed;
//! - cardinality reads the primary column and, only for spilled pairs,
//!   the multi-object set length;
//! - shape validation combines a class check with per-predicate subject
//!   bits.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Result, StoreError};
use crate::id::Id;
use crate::store::TripleStore;
use crate::telemetry::{ObserverSpan, Operation};

/// A node shape: "is an instance of `target_class`, and carries at least
/// one object for every predicate in `required`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Class the focus node must belong to.
    pub target_class: Id,
    /// Predicates the focus node must each have at least one object for.
    pub required: SmallVec<[Id; 4]>,
}

impl Shape {
    /// Builds a shape from its target class and required predicates.
    pub fn new(target_class: Id, required: impl IntoIterator<Item = Id>) -> Self {
        Self {
            target_class,
            required: required.into_iter().collect(),
        }
    }

    fn check_concrete(&self) -> Result<()> {
        if self.target_class.is_wildcard() {
            return Err(StoreError::InvalidWildcard {
                context: "shape target class must be concrete",
            });
        }
        if self.required.iter().any(|p| p.is_wildcard()) {
            return Err(StoreError::InvalidWildcard {
                context: "shape required predicates must be concrete",
            });
        }
        Ok(())
    }
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
    /// True iff subject `s` is an instance of `class`.
    ///
    /// Fast path: one load of the object-type column. When a subclass
    /// closure is registered, the direct type's ancestors are consulted
    /// too; otherwise only the direct type counts.
    pub fn is_class(&self, s: Id, class: Id) -> Result<bool> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::IsClass);
        concrete(s, "class-membership subject must be concrete")?;
        concrete(class, "class id must be concrete")?;
        Ok(self.is_class_unchecked(s, class))
    }

    pub(crate) fn is_class_unchecked(&self, s: Id, class: Id) -> bool {
        let direct = self.object_types.get_or(s, Id::WILDCARD);
        if direct.is_wildcard() {
            return false;
        }
        if direct == class {
            return true;
        }
        match &self.subclass_closure {
            Some(closure) => closure
                .get(&direct)
                .is_some_and(|ancestors| ancestors.contains(&class)),
            None => false,
        }
    }

    /// Number of distinct objects recorded for `(s, p)`.
    ///
    /// `0` when the primary slot is empty; `1` when it is filled and the
    /// pair never spilled; the spilled set's cardinality otherwise.
    pub fn count_objects(&self, s: Id, p: Id) -> Result<usize> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::CountObjects);
        concrete(s, "cardinality subject must be concrete")?;
        concrete(p, "cardinality predicate must be concrete")?;
        Ok(self.count_objects_unchecked(s, p))
    }

    pub(crate) fn count_objects_unchecked(&self, s: Id, p: Id) -> usize {
        let Some(row) = self.predicates.row(p) else {
            return 0;
        };
        if row.primary_object(s).is_wildcard() {
            return 0;
        }
        match self.multi.get(p, s) {
            Some(set) => set.len(),
            None => 1,
        }
    }

    /// True iff `(s, p)` carries at least `k` distinct objects. `k == 0`
    /// holds vacuously.
    pub fn min_count(&self, s: Id, p: Id, k: usize) -> Result<bool> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::CountObjects);
        concrete(s, "cardinality subject must be concrete")?;
        concrete(p, "cardinality predicate must be concrete")?;
        if k == 0 {
            return Ok(true);
        }
        Ok(self.count_objects_unchecked(s, p) >= k)
    }

    /// True iff `(s, p)` carries at most `k` distinct objects.
    pub fn max_count(&self, s: Id, p: Id, k: usize) -> Result<bool> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::CountObjects);
        concrete(s, "cardinality subject must be concrete")?;
        concrete(p, "cardinality predicate must be concrete")?;
        Ok(self.count_objects_unchecked(s, p) <= k)
    }

    /// Validates one focus node against one shape.
    pub fn validate_shape(&self, s: Id, shape: &Shape) -> Result<bool> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::ValidateShape);
        concrete(s, "shape focus node must be concrete")?;
        shape.check_concrete()?;
        Ok(self.validate_shape_unchecked(s, shape))
    }

    pub(crate) fn validate_shape_unchecked(&self, s: Id, shape: &Shape) -> bool {
        self.is_class_unchecked(s, shape.target_class)
            && shape.required.iter().all(|&p| {
                self.predicates
                    .row(p)
                    .is_some_and(|row| row.has_subject(s))
            })
    }

    /// Validates a batch of `(focus node, shape)` pairs, four lanes at a
    /// time. Results are element-wise identical to calling
    /// [`TripleStore::validate_shape`] per pair. An empty batch is
    /// malformed.
    pub fn validate_shape_batch(&self, checks: &[(Id, &Shape)]) -> Result<Vec<bool>> {
        let _span = ObserverSpan::enter(self.observer.as_deref(), Operation::ValidateShape);
        if checks.is_empty() {
            return Err(StoreError::Inconsistent {
                reason: "empty shape batch",
            });
        }
        for (s, shape) in checks {
            concrete(*s, "shape focus node must be concrete")?;
            shape.check_concrete()?;
        }

        let mut results = Vec::new();
        results
            .try_reserve_exact(checks.len())
            .map_err(|e| tern_util::ReserveError::exhausted("shape results", e))
            .map_err(StoreError::OutOfMemory)?;

        let split = checks.len() - checks.len() % 4;
        let (grouped, tail) = checks.split_at(split);

        for group in grouped.chunks_exact(4) {
            // Load the four direct types first, then fold the class masks,
            // then the required-property bits.
            let mut direct = [Id::WILDCARD; 4];
            for (lane, (s, _)) in group.iter().enumerate() {
                direct[lane] = self.object_types.get_or(*s, Id::WILDCARD);
            }

            let mut class_ok = [false; 4];
            for (lane, (_, shape)) in group.iter().enumerate() {
                class_ok[lane] = direct[lane].is_concrete()
                    && (direct[lane] == shape.target_class
                        || match &self.subclass_closure {
                            Some(closure) => closure
                                .get(&direct[lane])
                                .is_some_and(|a| a.contains(&shape.target_class)),
                            None => false,
                        });
            }

            for (lane, (s, shape)) in group.iter().enumerate() {
                let properties_ok = shape.required.iter().all(|&p| {
                    self.predicates
                        .row(p)
                        .is_some_and(|row| row.has_subject(*s))
                });
                results.push(class_ok[lane] && properties_ok);
            }
        }
        for (s, shape) in tail {
            results.push(self.validate_shape_unchecked(*s, shape));
        }
        Ok(results)
    }
}
