//! Persistent collections shared between configuration writers and lock-free readers.
//!
//! - [`ImmutableHashTree`]: hash-keyed AVL tree with copy-on-write inserts
//! - [`KeyExistsError`]: default conflict failure for duplicate keys

mod error;
/// Hash-keyed persistent AVL tree.
pub mod hash_tree;

pub use error::KeyExistsError;
pub use hash_tree::{ImmutableHashTree, Iter};
