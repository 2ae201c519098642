//! Error taxonomy for the engine core.
//!
//! Absence of a fact is never an error: asks against unknown ids return
//! `false` and enumerations come back empty. Only argument misuse and
//! resource exhaustion surface here.

use thiserror::Error;

use crate::id::Id;
use tern_util::ReserveError;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Allocation failed during interning, index growth, or
    /// materialization. The store is left in its pre-call state.
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] ReserveError),

    /// The reserved id `0` was passed in a position that requires a
    /// concrete identifier.
    #[error("reserved wildcard id is not valid here: {context}")]
    InvalidWildcard {
        /// Which argument was invalid.
        context: &'static str,
    },

    /// An id or count would exceed its representable range, or a
    /// fixed-capacity store was asked to grow past its construction hints.
    #[error("capacity overflow: {what}")]
    Overflow {
        /// Which limit was hit.
        what: &'static str,
    },

    /// A batched call received a zero-length or misshaped argument.
    #[error("malformed batch argument: {reason}")]
    Inconsistent {
        /// What was wrong with the batch.
        reason: &'static str,
    },

    /// An id that must name an interned term does not.
    ///
    /// Only used where a missing id is exceptional (resolving an id back
    /// to its bytes); a missing fact in a query is a normal `false`.
    #[error("unknown identifier {0}")]
    NotFound(Id),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
