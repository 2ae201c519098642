//! Dense 32-bit identifiers.
//!
//! Every subject, predicate, and object in the store is a 4-byte [`Id`]
//! handed out by the interner. Id `0` is reserved: it is the wildcard in
//! queries and the "nothing recorded here" sentinel inside the index
//! columns, and the interner never returns it.

use serde::{Deserialize, Serialize};
use tern_util::index_vec::Idx;

/// A dense identifier for an interned term.
///
/// `Id` is exactly 4 bytes, so a predicate column of a million subjects is
/// 4 MB of contiguous memory. Comparison is a single integer compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(u32);

impl Id {
    /// The reserved wildcard/absent sentinel. Never assigned to a term.
    pub const WILDCARD: Id = Id(0);

    /// Builds an id from its raw value. The interner is the normal source
    /// of ids; this exists for callers that persist raw id values.
    #[inline]
    pub const fn from_u32(raw: u32) -> Self {
        Id(raw)
    }

    /// The raw 32-bit value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// True for the reserved sentinel.
    #[inline]
    pub const fn is_wildcard(self) -> bool {
        self.0 == 0
    }

    /// True for any assigned (non-sentinel) id.
    #[inline]
    pub const fn is_concrete(self) -> bool {
        self.0 != 0
    }
}

impl Idx for Id {
    #[inline]
    fn from_usize(idx: usize) -> Self {
        debug_assert!(idx <= u32::MAX as usize);
        Id(idx as u32)
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(Id, u32);

    #[test]
    fn wildcard_is_zero() {
        assert_eq!(Id::WILDCARD.as_u32(), 0);
        assert!(Id::WILDCARD.is_wildcard());
        assert!(!Id::from_u32(1).is_wildcard());
    }

    #[test]
    fn display_is_hash_prefixed() {
        assert_eq!(Id::from_u32(42).to_string(), "#42");
    }
}
