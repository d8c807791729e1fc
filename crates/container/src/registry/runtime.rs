//! Runtime registry with atomic publication.
//!
//! # Role
//!
//! Thread-safe entrypoint for reading and extending the strategy registry. Readers load the
//! current [`RegistrySnapshot`] without locking; writers derive a new snapshot and publish it
//! with a compare-and-swap loop.
//!
//! # Invariants
//!
//! - Concurrent publications are linearizable: no block is lost when two writers race.
//!   - Tested by: `tests::test_concurrent_blocks_are_not_lost`
//! - A failed block publishes nothing.
//!   - Tested by: `tests::test_rejected_key_publishes_nothing`

use std::sync::Arc;

use arc_swap::ArcSwap;
use trellis_immutable::ImmutableHashTree;

use super::block::{BlockItem, RegistrationBlock};
use super::collection::StrategyCollection;
use super::precedence::{DuplicatePolicy, collection_order};
use super::snapshot::RegistrySnapshot;
use crate::activation::StaticInjectionContext;
use crate::error::RegistryError;
use crate::strategy::{ExportConfig, Strategy, StrategyFilter, StrategyId};
use crate::types::{LocateKey, TypeKey};

/// Closed generic strategies by (open strategy, requested closed type).
type ClosedGenerics = ImmutableHashTree<(StrategyId, TypeKey), Arc<Strategy>>;

/// Registry of strategies for a container.
pub struct StrategyRegistry {
	snap: ArcSwap<RegistrySnapshot>,
	closed: ArcSwap<ClosedGenerics>,
	policy: DuplicatePolicy,
}

impl Default for StrategyRegistry {
	fn default() -> Self {
		Self::new(DuplicatePolicy::default())
	}
}

impl StrategyRegistry {
	pub fn new(policy: DuplicatePolicy) -> Self {
		Self {
			snap: ArcSwap::from_pointee(RegistrySnapshot::default()),
			closed: ArcSwap::from_pointee(ClosedGenerics::default()),
			policy,
		}
	}

	/// Current snapshot; stays valid and unchanged while held.
	#[inline]
	pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
		self.snap.load_full()
	}

	pub fn generation(&self) -> u64 {
		self.snap.load().generation
	}

	/// Publishes a single export.
	pub fn add_strategy(&self, config: ExportConfig) -> Result<Arc<Strategy>, RegistryError> {
		let mut block = RegistrationBlock::new();
		block.export(config);
		// one export in, one strategy out
		Ok(self.publish(block)?.swap_remove(0))
	}

	/// Publishes every item of `block` as one new snapshot and returns the added strategies.
	///
	/// Identities were assigned when the block was filled; ordinals are assigned here,
	/// against the snapshot the block lands on, so they follow publication order.
	pub fn publish(&self, block: RegistrationBlock) -> Result<Vec<Arc<Strategy>>, RegistryError> {
		let items: Vec<BlockItem> = block.into_items();

		loop {
			let old = self.snap.load_full();

			let mut next = (*old).clone();
			let mut added = Vec::new();
			for item in &items {
				next = match item {
					BlockItem::Strategy(strategy) => {
						let published = Arc::new(strategy.published(next.next_ordinal()));
						let grown = next.with_strategy(&published, self.policy)?;
						added.push(published);
						grown
					}
					BlockItem::Wrapper(wrapper) => next.with_wrapper(Arc::clone(wrapper)),
					BlockItem::Provider(provider) => next.with_provider(Arc::clone(provider)),
				};
			}
			next.generation = old.generation + 1;
			let new_arc = Arc::new(next);

			let prev = self.snap.compare_and_swap(&old, new_arc);
			if Arc::ptr_eq(&prev, &old) {
				tracing::debug!(
					generation = old.generation + 1,
					strategies = added.len(),
					items = items.len(),
					"registry published"
				);
				return Ok(added);
			}
			// lost the race, rebuild from the newer snapshot
		}
	}

	/// Export bucket for `ty` in the current snapshot.
	pub fn collection(&self, ty: &TypeKey) -> Option<Arc<StrategyCollection>> {
		self.snap.load().collection(ty).cloned()
	}

	/// Primary strategy for `ty`, ignoring conditions.
	pub fn primary(&self, ty: &TypeKey) -> Option<Arc<Strategy>> {
		self.snap.load().collection(ty).and_then(|c| c.primary().cloned())
	}

	pub fn keyed(&self, ty: &TypeKey, key: &LocateKey) -> Option<Arc<Strategy>> {
		self.snap.load().collection(ty).and_then(|c| c.keyed(key).cloned())
	}

	/// Unkeyed strategies for `ty` in collection order.
	pub fn get_all(&self, ty: &TypeKey, filter: Option<&StrategyFilter>, prioritize: Option<&StrategyFilter>) -> Vec<Arc<Strategy>> {
		let Some(collection) = self.collection(ty) else {
			return Vec::new();
		};
		let filtered = collection
			.strategies()
			.iter()
			.filter(|s| filter.is_none_or(|f| f.matches(s)))
			.cloned();
		collection_order(filtered, prioritize)
	}

	/// Every strategy, ordered by ordinal.
	pub fn all_strategies(&self) -> Vec<Arc<Strategy>> {
		self.snap.load().all_strategies().to_vec()
	}

	/// Returns true if `ty` has a primary usable for `context`.
	pub fn can_locate(&self, ty: &TypeKey, context: &StaticInjectionContext) -> bool {
		self.snap.load().collection(ty).is_some_and(|c| c.primary_for(context, None).is_some())
	}

	/// Closes `open` for `requested`, reusing an earlier closure of the same pair.
	pub(crate) fn close_generic(&self, open: &Arc<Strategy>, requested: &TypeKey) -> Option<Arc<Strategy>> {
		let key = (open.id(), requested.clone());
		if let Some(closed) = self.closed.load().get(&key) {
			return Some(Arc::clone(closed));
		}

		let candidate = Arc::new(open.close(requested)?);
		let mut winner = Arc::clone(&candidate);
		self.closed.rcu(|memo| match memo.get(&key) {
			Some(existing) => {
				winner = Arc::clone(existing);
				Arc::clone(memo)
			}
			None => {
				winner = Arc::clone(&candidate);
				Arc::new(memo.upsert(key.clone(), Arc::clone(&candidate)))
			}
		});
		tracing::trace!(open = %open, closed = %requested, "closed generic strategy");
		Some(winner)
	}
}
