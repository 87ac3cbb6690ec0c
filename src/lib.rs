//! Ordered, prefix-compressed in-memory index for byte-string keys.
//!
//! Keys live along the edges of a radix tree with path compression: runs
//! of single-child nodes collapse into one node carrying the whole run, so
//! dense key sets with long shared prefixes stay compact. Every key maps
//! to an optional value, lookups and ordered scans are O(key length), and
//! iteration visits keys in lexicographic byte order in both directions.
//!
//! ```
//! use radix_index::{RadixTree, SeekOp};
//!
//! let mut tree = RadixTree::new();
//! tree.insert(b"romane", Some(1))?;
//! tree.insert(b"romanus", Some(2))?;
//! tree.insert(b"rubens", Some(3))?;
//! assert_eq!(tree.get(b"romanus"), Some(Some(&2)));
//!
//! let mut it = tree.iter();
//! it.seek(SeekOp::Ge, b"rom")?;
//! assert_eq!(it.key(), b"romane");
//! assert_eq!(it.value(), Some(&1));
//!
//! assert_eq!(tree.remove(b"rubens"), Some(Some(3)));
//! # Ok::<(), radix_index::RadixError>(())
//! ```

pub mod error;
pub mod iter;
mod stack;
pub mod tree;

#[cfg(test)]
mod proptests;

pub use error::RadixError;
pub use iter::{RadixIter, SeekOp};
pub use tree::{InsertOutcome, RadixTree, MAX_RUN_LEN};
