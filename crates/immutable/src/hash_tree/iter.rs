use std::iter::FusedIterator;

use smallvec::SmallVec;

use super::node::Node;

/// In-order iterator over one version of an [`super::ImmutableHashTree`].
pub struct Iter<'a, K, V> {
	stack: SmallVec<[&'a Node<K, V>; 16]>,
	pending: std::slice::Iter<'a, (K, V)>,
	remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
	pub(super) fn new(root: Option<&'a Node<K, V>>, len: usize) -> Self {
		let mut iter = Self {
			stack: SmallVec::new(),
			pending: Default::default(),
			remaining: len,
		};
		iter.descend(root);
		iter
	}

	fn descend(&mut self, mut current: Option<&'a Node<K, V>>) {
		while let Some(node) = current {
			self.stack.push(node);
			current = node.left.as_deref();
		}
	}
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
	type Item = (&'a K, &'a V);

	fn next(&mut self) -> Option<Self::Item> {
		if let Some((k, v)) = self.pending.next() {
			self.remaining -= 1;
			return Some((k, v));
		}

		let node = self.stack.pop()?;
		self.descend(node.right.as_deref());
		self.pending = node.conflicts.iter();
		self.remaining -= 1;
		Some((&node.key, &node.value))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
	fn clone(&self) -> Self {
		Self {
			stack: self.stack.clone(),
			pending: self.pending.clone(),
			remaining: self.remaining,
		}
	}
}
