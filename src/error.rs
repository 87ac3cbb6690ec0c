//! Error types for the radix index.

use thiserror::Error;

/// Errors reported by tree and iterator operations.
///
/// Key-not-found and try-insert conflicts are not errors: they are ordinary
/// outcomes reported through `Option` and [`crate::tree::InsertOutcome`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadixError {
    /// An allocation failed while growing or reshaping the tree.
    ///
    /// Every multi-node structural change is staged before it is linked in,
    /// so on this error the tree is left exactly as it was before the
    /// failing call.
    #[error("out of memory")]
    OutOfMemory,

    /// A seek operator string could not be parsed.
    #[error("invalid seek operator")]
    InvalidOperator,
}

impl From<std::collections::TryReserveError> for RadixError {
    fn from(_: std::collections::TryReserveError) -> Self {
        RadixError::OutOfMemory
    }
}

impl From<smallvec::CollectionAllocErr> for RadixError {
    fn from(_: smallvec::CollectionAllocErr) -> Self {
        RadixError::OutOfMemory
    }
}
