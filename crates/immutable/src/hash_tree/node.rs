use std::borrow::Borrow;
use std::sync::Arc;

use smallvec::SmallVec;

pub(super) type Link<K, V> = Option<Arc<Node<K, V>>>;

/// Keys whose hash equals the node hash but which compare unequal to the node key.
pub(super) type Conflicts<K, V> = SmallVec<[(K, V); 1]>;

pub(super) struct Node<K, V> {
	pub(super) hash: u64,
	pub(super) key: K,
	pub(super) value: V,
	pub(super) conflicts: Conflicts<K, V>,
	pub(super) left: Link<K, V>,
	pub(super) right: Link<K, V>,
	pub(super) height: u32,
}

#[inline]
pub(super) fn height<K, V>(link: &Link<K, V>) -> u32 {
	link.as_ref().map_or(0, |n| n.height)
}

impl<K, V> Node<K, V> {
	pub(super) fn find<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Eq + ?Sized,
	{
		if self.key.borrow() == key {
			return Some(&self.value);
		}
		self.conflicts.iter().find(|(k, _)| k.borrow() == key).map(|(_, v)| v)
	}
}

fn assemble<K, V>(hash: u64, key: K, value: V, conflicts: Conflicts<K, V>, left: Link<K, V>, right: Link<K, V>) -> Arc<Node<K, V>> {
	let height = 1 + height(&left).max(height(&right));
	Arc::new(Node {
		hash,
		key,
		value,
		conflicts,
		left,
		right,
		height,
	})
}

impl<K: Clone, V: Clone> Node<K, V> {
	fn leaf(hash: u64, key: K, value: V) -> Arc<Self> {
		assemble(hash, key, value, SmallVec::new(), None, None)
	}

	fn with_children(&self, left: Link<K, V>, right: Link<K, V>) -> Arc<Self> {
		assemble(self.hash, self.key.clone(), self.value.clone(), self.conflicts.clone(), left, right)
	}

	/// Resolves an insert whose hash landed on this node.
	fn merge<E, F>(&self, key: K, value: V, on_conflict: F) -> Result<(Arc<Self>, bool), E>
	where
		K: Eq,
		F: FnOnce(&V, V) -> Result<V, E>,
	{
		if self.key == key {
			let value = on_conflict(&self.value, value)?;
			let node = assemble(self.hash, self.key.clone(), value, self.conflicts.clone(), self.left.clone(), self.right.clone());
			return Ok((node, false));
		}

		let mut conflicts = self.conflicts.clone();
		let added = match conflicts.iter_mut().find(|(k, _)| *k == key) {
			Some(slot) => {
				let resolved = on_conflict(&slot.1, value)?;
				slot.1 = resolved;
				false
			}
			None => {
				conflicts.push((key, value));
				true
			}
		};
		let node = assemble(self.hash, self.key.clone(), self.value.clone(), conflicts, self.left.clone(), self.right.clone());
		Ok((node, added))
	}
}

/// Copies the search path for `hash` and returns the rebalanced root plus whether an entry
/// was added (false when an existing key was resolved through `on_conflict`).
pub(super) fn insert<K, V, E, F>(link: &Link<K, V>, hash: u64, key: K, value: V, on_conflict: F) -> Result<(Arc<Node<K, V>>, bool), E>
where
	K: Eq + Clone,
	V: Clone,
	F: FnOnce(&V, V) -> Result<V, E>,
{
	let Some(node) = link else {
		return Ok((Node::leaf(hash, key, value), true));
	};

	if hash == node.hash {
		return node.merge(key, value, on_conflict);
	}

	if hash < node.hash {
		let (left, added) = insert(&node.left, hash, key, value, on_conflict)?;
		Ok((balance(node.with_children(Some(left), node.right.clone())), added))
	} else {
		let (right, added) = insert(&node.right, hash, key, value, on_conflict)?;
		Ok((balance(node.with_children(node.left.clone(), Some(right))), added))
	}
}

fn balance<K: Clone, V: Clone>(node: Arc<Node<K, V>>) -> Arc<Node<K, V>> {
	let lh = height(&node.left);
	let rh = height(&node.right);

	if lh > rh + 1 {
		let Some(left) = &node.left else { return node };
		if height(&left.right) > height(&left.left) {
			let pivoted = node.with_children(Some(rotate_left(left)), node.right.clone());
			return rotate_right(&pivoted);
		}
		return rotate_right(&node);
	}

	if rh > lh + 1 {
		let Some(right) = &node.right else { return node };
		if height(&right.left) > height(&right.right) {
			let pivoted = node.with_children(node.left.clone(), Some(rotate_right(right)));
			return rotate_left(&pivoted);
		}
		return rotate_left(&node);
	}

	node
}

fn rotate_right<K: Clone, V: Clone>(node: &Arc<Node<K, V>>) -> Arc<Node<K, V>> {
	let Some(pivot) = &node.left else {
		return Arc::clone(node);
	};
	let demoted = node.with_children(pivot.right.clone(), node.right.clone());
	pivot.with_children(pivot.left.clone(), Some(demoted))
}

fn rotate_left<K: Clone, V: Clone>(node: &Arc<Node<K, V>>) -> Arc<Node<K, V>> {
	let Some(pivot) = &node.right else {
		return Arc::clone(node);
	};
	let demoted = node.with_children(node.left.clone(), pivot.left.clone());
	pivot.with_children(Some(demoted), pivot.right.clone())
}

#[cfg(test)]
pub(super) fn check_balanced<K, V>(link: &Link<K, V>) -> bool {
	let Some(node) = link else { return true };
	let lh = height(&node.left);
	let rh = height(&node.right);
	let ordered = node.left.as_ref().is_none_or(|l| l.hash < node.hash) && node.right.as_ref().is_none_or(|r| r.hash > node.hash);
	lh.abs_diff(rh) <= 1 && node.height == 1 + lh.max(rh) && ordered && check_balanced(&node.left) && check_balanced(&node.right)
}
