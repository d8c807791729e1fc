use thiserror::Error;

/// Raised by [`crate::ImmutableHashTree::insert`] when the key is already present
/// and no conflict resolver was supplied.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("key already exists (hash {hash:#018x})")]
pub struct KeyExistsError {
	/// Hash of the conflicting key.
	pub hash: u64,
}
