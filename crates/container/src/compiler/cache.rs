use std::sync::Arc;

use arc_swap::ArcSwap;
use trellis_immutable::ImmutableHashTree;

use super::CompiledProducer;
use crate::types::{LocateKey, TypeKey};

type ProducerKey = (TypeKey, Option<LocateKey>);

#[derive(Default)]
struct Entries {
	generation: u64,
	producers: ImmutableHashTree<ProducerKey, Arc<CompiledProducer>>,
}

/// Compiled producers for unfiltered top-level requests, bound to one registry generation.
///
/// Entries from an older generation are discarded wholesale on the next insert.
#[derive(Default)]
pub(crate) struct ProducerCache {
	entries: ArcSwap<Entries>,
}

impl ProducerCache {
	pub(crate) fn get(&self, generation: u64, ty: &TypeKey, key: Option<&LocateKey>) -> Option<Arc<CompiledProducer>> {
		let entries = self.entries.load();
		if entries.generation != generation {
			return None;
		}
		entries.producers.get(&(ty.clone(), key.cloned())).cloned()
	}

	/// Publishes `producer` unless an equivalent one got there first.
	///
	/// Returns the producer callers should use, and whether it was `producer` itself.
	/// Producers built against an older generation than the cache's are returned unpublished.
	pub(crate) fn insert(&self, producer: Arc<CompiledProducer>) -> (Arc<CompiledProducer>, bool) {
		let key = (producer.ty().clone(), producer.key().cloned());
		let mut winner = Arc::clone(&producer);
		let mut published = false;

		self.entries.rcu(|entries| {
			winner = Arc::clone(&producer);
			published = false;
			if entries.generation > producer.generation() {
				return Arc::clone(entries);
			}
			let base = if entries.generation < producer.generation() {
				ImmutableHashTree::default()
			} else if let Some(existing) = entries.producers.get(&key) {
				winner = Arc::clone(existing);
				return Arc::clone(entries);
			} else {
				entries.producers.clone()
			};
			published = true;
			Arc::new(Entries {
				generation: producer.generation(),
				producers: base.upsert(key.clone(), Arc::clone(&producer)),
			})
		});

		(winner, published)
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.load().producers.len()
	}
}
