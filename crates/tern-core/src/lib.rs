//! tern-core - In-Memory Semantic Knowledge Engine
//!
//! An in-memory triple store built for deterministic, cache-resident
//! evaluation: interned 4-byte ids, per-predicate bit vectors and dense
//! object columns, and a spill table for the rare `(predicate, subject)`
//! pairs that carry several objects. Every primitive lookup touches a
//! bounded handful of words regardless of dataset size, so reasoners and
//! validators can chain thousands of asks per request.
//!
//! # Quick tour
//!
//! ```
//! use tern_core::{Id, TripleStore};
//!
//! let mut store = TripleStore::new().unwrap();
//! let alice = store.intern("ex:alice").unwrap();
//! let knows = store.intern("ex:knows").unwrap();
//! let bob = store.intern("ex:bob").unwrap();
//!
//! store.add_triple(alice, knows, bob).unwrap();
//!
//! assert!(store.ask(alice, knows, bob).unwrap());
//! assert!(store.ask(alice, knows, Id::WILDCARD).unwrap());
//! assert_eq!(store.materialize_subjects(knows, bob).unwrap(), vec![alice]);
//! ```
//!
//! # What this crate is not
//!
//! No disk backing, no deletion, no transactions, no SPARQL parsing, no
//! inference closure. Higher layers own those; they talk to this crate
//! through the operations on [`TripleStore`].
//!
//! # Concurrency
//!
//! One owner per store serializes mutation. Read-only operations against a
//! quiesced store are safe from parallel threads; the store holds no
//! internal lock.

pub mod error;
pub mod id;
pub mod intern;
pub mod shape;
pub mod store;
pub mod telemetry;

mod index;
mod multi;

pub use error::{Result, StoreError};
pub use id::Id;
pub use intern::InternerStats;
pub use shape::Shape;
pub use store::{
    Objects, StoreOptions, StoreStats, TriplePattern, TripleStore, RDF_TYPE,
};
pub use telemetry::{Operation, SpanObserver};

// Re-exported so consumers of `subject_vector` can combine predicates
// without depending on the util crate directly.
pub use tern_util::BitVec;
