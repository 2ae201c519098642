//! Core error types for the tern-util crate.

use std::collections::TryReserveError;
use thiserror::Error;

/// Error produced by fallible growth operations.
///
/// Every structure in this crate and in the engine core grows through
/// `try_reserve`, so an allocation failure surfaces here instead of
/// aborting the process. `what` names the structure that was growing when
/// the allocation failed; `source` carries the allocator report when the
/// failing container exposes one.
#[derive(Debug, Error)]
#[error("allocation failed while growing {what}")]
pub struct ReserveError {
    what: &'static str,
    #[source]
    source: Option<TryReserveError>,
}

impl ReserveError {
    /// Wraps an allocator report with the name of the growing structure.
    pub fn exhausted(what: &'static str, source: TryReserveError) -> Self {
        Self {
            what,
            source: Some(source),
        }
    }

    /// Growth failure in a container that reports no allocator detail.
    pub fn exhausted_untracked(what: &'static str) -> Self {
        Self { what, source: None }
    }

    /// Which structure was growing.
    pub fn what(&self) -> &'static str {
        self.what
    }
}

/// Result type alias for growth operations.
pub type ReserveResult<T> = std::result::Result<T, ReserveError>;
