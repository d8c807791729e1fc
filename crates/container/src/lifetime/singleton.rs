use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::ReentrantMutex;
use trellis_immutable::ImmutableHashTree;

use super::LifestyleKey;
use crate::error::Result;
use crate::types::Instance;

/// Lifestyle cache of one scope.
///
/// Reads are lock-free. Creation is serialized per scope by a reentrant lock so a singleton
/// whose construction needs another singleton of the same scope cannot deadlock.
#[derive(Default)]
pub(crate) struct SingletonCache {
	entries: ArcSwap<ImmutableHashTree<LifestyleKey, Instance>>,
	create: ReentrantMutex<()>,
}

impl SingletonCache {
	pub(crate) fn get(&self, key: &LifestyleKey) -> Option<Instance> {
		self.entries.load().get(key).cloned()
	}

	/// Returns the cached value or creates it once with `create`.
	///
	/// Failures and absent values are not cached.
	pub(crate) fn get_or_try_insert<F>(&self, key: &LifestyleKey, create: F) -> Result<Option<Instance>>
	where
		F: FnOnce() -> Result<Option<Instance>>,
	{
		if let Some(value) = self.get(key) {
			return Ok(Some(value));
		}

		let _guard = self.create.lock();
		if let Some(value) = self.get(key) {
			return Ok(Some(value));
		}

		let Some(value) = create()? else {
			return Ok(None);
		};
		self.entries.rcu(|entries| entries.upsert(key.clone(), Arc::clone(&value)));
		Ok(Some(value))
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.load().len()
	}

	pub(crate) fn clear(&self) {
		self.entries.store(Arc::default());
	}
}
