use crate::types::{BoxError, Instance, TypeKey};

/// User-supplied open-generic wrapper, consulted after the built-in shapes.
///
/// A wrapper registered for definition `Audited<>` satisfies requests for `Audited<T>` by
/// locating the inner type it names and wrapping the result.
pub trait Wrapper: Send + Sync {
	/// Generic definition this wrapper handles, as a [`TypeKey::Definition`].
	fn definition(&self) -> TypeKey;

	/// Type to locate for a request of the closed wrapper type `requested`.
	fn inner_type(&self, requested: &TypeKey) -> Option<TypeKey> {
		requested.generic_arguments().first().cloned()
	}

	/// Wraps the located inner value.
	fn wrap(&self, requested: &TypeKey, inner: Instance) -> Result<Instance, BoxError>;
}
