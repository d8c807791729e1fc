//! Hash-keyed persistent AVL tree.
//!
//! # Role
//!
//! Every mutable-looking table in the container (strategy buckets, singleton caches, the
//! producer cache) is an [`ImmutableHashTree`] behind an atomic pointer. Writers build a new
//! root, readers keep whatever root they loaded.
//!
//! # Invariants
//!
//! - Nodes are never mutated after construction; an insert copies the search path only and
//!   shares every untouched subtree with the previous version.
//!   - Tested by: `tests::test_snapshot_is_unaffected_by_later_inserts`
//! - Child heights differ by at most one after every insert (rebalanced bottom-up by single
//!   or double rotation).
//!   - Tested by: `tests::prop_tree_stays_balanced`
//! - In-order iteration yields ascending hash order; keys sharing a hash are yielded in
//!   insertion order (node key first, then its overflow list).
//!   - Tested by: `tests::test_colliding_keys_are_retrievable_and_iterated`

mod iter;
mod node;

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use rustc_hash::FxBuildHasher;

pub use self::iter::Iter;
use self::node::Link;
use crate::KeyExistsError;

/// Persistent map from `K` to `V`, ordered by key hash.
///
/// Cloning is O(1) and yields an independent handle to the same version.
pub struct ImmutableHashTree<K, V, S = FxBuildHasher> {
	root: Link<K, V>,
	len: usize,
	hasher: S,
}

impl<K, V, S: Clone> Clone for ImmutableHashTree<K, V, S> {
	fn clone(&self) -> Self {
		Self {
			root: self.root.clone(),
			len: self.len,
			hasher: self.hasher.clone(),
		}
	}
}

impl<K, V, S: Default> Default for ImmutableHashTree<K, V, S> {
	fn default() -> Self {
		Self {
			root: None,
			len: 0,
			hasher: S::default(),
		}
	}
}

impl<K, V> ImmutableHashTree<K, V, FxBuildHasher> {
	/// Creates an empty tree using the default hasher.
	pub fn new() -> Self {
		Self::default()
	}
}

impl<K, V, S> ImmutableHashTree<K, V, S> {
	/// Creates an empty tree using `hasher` to place keys.
	pub fn with_hasher(hasher: S) -> Self {
		Self { root: None, len: 0, hasher }
	}

	/// Number of entries, colliding keys included.
	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	/// Returns true if the tree holds no entries.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.root.is_none()
	}

	/// Height of the root node (0 for an empty tree).
	#[inline]
	pub fn height(&self) -> u32 {
		node::height(&self.root)
	}

	/// Iterates entries in ascending hash order.
	///
	/// The iterator borrows this version only, so it can be restarted at will and is never
	/// affected by inserts made through other handles.
	pub fn iter(&self) -> Iter<'_, K, V> {
		Iter::new(self.root.as_deref(), self.len)
	}

	/// Iterates keys in ascending hash order.
	pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
		self.iter().map(|(k, _)| k)
	}

	/// Iterates values in ascending hash order of their keys.
	pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
		self.iter().map(|(_, v)| v)
	}
}

impl<K, V, S> ImmutableHashTree<K, V, S>
where
	K: Hash + Eq + Clone,
	V: Clone,
	S: BuildHasher + Clone,
{
	/// Returns a new version containing `key`, failing if the key already exists.
	pub fn insert(&self, key: K, value: V) -> Result<Self, KeyExistsError> {
		let hash = self.hasher.hash_one(&key);
		self.try_insert_hashed(hash, key, value, |_, _| Err(KeyExistsError { hash }))
	}

	/// Returns a new version containing `key`, resolving an existing value with
	/// `on_conflict(current, incoming)`.
	pub fn insert_with<F>(&self, key: K, value: V, on_conflict: F) -> Self
	where
		F: FnOnce(&V, V) -> V,
	{
		let hash = self.hasher.hash_one(&key);
		match self.try_insert_hashed::<std::convert::Infallible, _>(hash, key, value, |current, incoming| {
			Ok(on_conflict(current, incoming))
		}) {
			Ok(tree) => tree,
			Err(never) => match never {},
		}
	}

	/// Returns a new version where `key` maps to `value`, replacing any previous value.
	pub fn upsert(&self, key: K, value: V) -> Self {
		self.insert_with(key, value, |_, incoming| incoming)
	}

	/// Fallible variant of [`Self::insert_with`]; an `Err` from the resolver leaves no trace.
	pub fn try_insert_with<E, F>(&self, key: K, value: V, on_conflict: F) -> Result<Self, E>
	where
		F: FnOnce(&V, V) -> Result<V, E>,
	{
		let hash = self.hasher.hash_one(&key);
		self.try_insert_hashed(hash, key, value, on_conflict)
	}

	fn try_insert_hashed<E, F>(&self, hash: u64, key: K, value: V, on_conflict: F) -> Result<Self, E>
	where
		F: FnOnce(&V, V) -> Result<V, E>,
	{
		let (root, added) = node::insert(&self.root, hash, key, value, on_conflict)?;
		Ok(Self {
			root: Some(root),
			len: self.len + usize::from(added),
			hasher: self.hasher.clone(),
		})
	}

	/// Looks up the value stored for `key`.
	pub fn get<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let hash = self.hasher.hash_one(key);
		let mut current = self.root.as_deref();

		while let Some(node) = current {
			if hash == node.hash {
				return node.find(key);
			}
			current = if hash < node.hash { node.left.as_deref() } else { node.right.as_deref() };
		}
		None
	}

	/// Returns true if `key` is present.
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.get(key).is_some()
	}
}

impl<'a, K, V, S> IntoIterator for &'a ImmutableHashTree<K, V, S> {
	type Item = (&'a K, &'a V);
	type IntoIter = Iter<'a, K, V>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ImmutableHashTree<K, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

impl<K, V> FromIterator<(K, V)> for ImmutableHashTree<K, V, FxBuildHasher>
where
	K: Hash + Eq + Clone,
	V: Clone,
{
	/// Builds a tree where later duplicates replace earlier ones.
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		iter.into_iter().fold(Self::new(), |tree, (k, v)| tree.upsert(k, v))
	}
}

#[cfg(test)]
impl<K, V, S> ImmutableHashTree<K, V, S> {
	/// Walks the whole tree and returns false on the first unbalanced or misordered node.
	pub(crate) fn is_balanced(&self) -> bool {
		node::check_balanced(&self.root)
	}

	/// Returns true if both handles share the root allocation.
	pub(crate) fn shares_root_with(&self, other: &Self) -> bool {
		match (&self.root, &other.root) {
			(Some(a), Some(b)) => std::sync::Arc::ptr_eq(a, b),
			(None, None) => true,
			_ => false,
		}
	}
}
