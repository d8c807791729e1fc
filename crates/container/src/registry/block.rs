use std::sync::Arc;

use crate::activation::{MissingStrategyProvider, Wrapper};
use crate::strategy::{ExportConfig, Strategy, StrategyId};

pub(super) enum BlockItem {
	Strategy(Strategy),
	Wrapper(Arc<dyn Wrapper>),
	Provider(Arc<dyn MissingStrategyProvider>),
}

/// Batch of registrations published as one registry snapshot.
///
/// Nothing is visible to readers until the block is published, and a block that fails
/// (for example on a rejected keyed duplicate) publishes nothing.
#[derive(Default)]
pub struct RegistrationBlock {
	items: Vec<BlockItem>,
}

impl RegistrationBlock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues an export and returns the identity it will publish under.
	///
	/// Its registration order is fixed when the block is published, not here.
	pub fn export(&mut self, config: ExportConfig) -> StrategyId {
		let strategy = Strategy::from_config(config);
		let id = strategy.id();
		self.items.push(BlockItem::Strategy(strategy));
		id
	}

	/// Queues a user wrapper for its generic definition.
	pub fn wrapper(&mut self, wrapper: impl Wrapper + 'static) -> &mut Self {
		self.items.push(BlockItem::Wrapper(Arc::new(wrapper)));
		self
	}

	/// Queues a collaborator asked for strategies when a request cannot be satisfied.
	pub fn missing_strategy_provider(&mut self, provider: impl MissingStrategyProvider + 'static) -> &mut Self {
		self.items.push(BlockItem::Provider(Arc::new(provider)));
		self
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub(super) fn into_items(self) -> Vec<BlockItem> {
		self.items
	}
}
