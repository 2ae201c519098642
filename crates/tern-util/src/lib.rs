//! tern-util - Foundation Types for the Tern Knowledge Engine
//!
//! This crate provides the dense, cache-friendly building blocks that the
//! engine core assembles into its triple indices. Nothing in here knows what
//! a triple is; everything in here is measured in words and slots.
//!
//! # Components
//!
//! - [`bitvec::BitVec`]: a growable bitmap over 64-bit words with
//!   population count, intersection/union, and an ascending set-bit
//!   iterator. One of these per predicate records which subjects carry at
//!   least one object.
//! - [`index_vec::IndexVec`]: a vector indexed by a typed id instead of
//!   `usize`, so subject columns cannot be indexed with predicate ids by
//!   accident.
//! - [`error::ReserveError`]: the allocation-failure error produced by
//!   every growth path in this crate. Growth is fallible by design: the
//!   engine promises its callers that running out of memory is a value
//!   they can match on, not an abort.
//!
//! # Design constraints
//!
//! All structures grow by doubling and never shrink. Growth preserves prior
//! contents bit for bit. No structure performs interior mutation through
//! shared references; the owner serializes writes.

pub mod bitvec;
pub mod error;
pub mod index_vec;

pub use bitvec::BitVec;
pub use error::{ReserveError, ReserveResult};
pub use index_vec::{Idx, IndexVec};
