//! Published registry view.
//!
//! # Role
//!
//! Pure view type searched by the plan builder. Contains no publication logic; new versions
//! are derived with [`RegistrySnapshot::with_strategy`] and friends and swapped in by
//! [`super::StrategyRegistry`].

use std::sync::Arc;

use trellis_immutable::ImmutableHashTree;

use super::collection::StrategyCollection;
use super::precedence::DuplicatePolicy;
use crate::activation::{MissingStrategyProvider, Wrapper};
use crate::error::RegistryError;
use crate::strategy::{Strategy, StrategyKind};
use crate::types::TypeKey;

/// One consistent version of the registry.
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
	/// Bumped on every publication; invalidates compiled producers.
	pub(crate) generation: u64,
	pub(crate) exports: ImmutableHashTree<TypeKey, Arc<StrategyCollection>>,
	pub(crate) decorators: ImmutableHashTree<TypeKey, Arc<StrategyCollection>>,
	pub(crate) names: ImmutableHashTree<Arc<str>, Arc<StrategyCollection>>,
	/// User wrappers by generic definition.
	pub(crate) wrappers: ImmutableHashTree<TypeKey, Arc<dyn Wrapper>>,
	pub(crate) providers: Arc<[Arc<dyn MissingStrategyProvider>]>,
	/// Every strategy in publication order, which is ascending ordinal.
	pub(crate) all: Arc<[Arc<Strategy>]>,
}

impl RegistrySnapshot {
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Export bucket for `ty`.
	pub fn collection(&self, ty: &TypeKey) -> Option<&Arc<StrategyCollection>> {
		self.exports.get(ty)
	}

	/// Decorators registered for `ty`.
	pub fn decorators(&self, ty: &TypeKey) -> Option<&Arc<StrategyCollection>> {
		self.decorators.get(ty)
	}

	/// Strategies registered under `name`.
	pub fn named(&self, name: &str) -> Option<&Arc<StrategyCollection>> {
		self.names.get(name)
	}

	pub fn wrapper(&self, definition: &TypeKey) -> Option<&Arc<dyn Wrapper>> {
		self.wrappers.get(definition)
	}

	pub fn providers(&self) -> &[Arc<dyn MissingStrategyProvider>] {
		&self.providers
	}

	pub fn all_strategies(&self) -> &[Arc<Strategy>] {
		&self.all
	}

	/// Ordinal the next published strategy receives.
	pub(super) fn next_ordinal(&self) -> u64 {
		self.all.len() as u64 + 1
	}

	/// Returns true if `ty` has an unkeyed or keyed export.
	pub fn has_export(&self, ty: &TypeKey) -> bool {
		self.collection(ty).is_some_and(|c| !c.is_empty())
	}

	pub(super) fn with_strategy(&self, strategy: &Arc<Strategy>, policy: DuplicatePolicy) -> Result<Self, RegistryError> {
		validate(strategy)?;
		let mut next = self.clone();
		let bucket = if strategy.is_decorator() { &mut next.decorators } else { &mut next.exports };

		for ty in strategy.exports() {
			let collection = bucket.get(ty).map_or_else(StrategyCollection::default, |c| (**c).clone());
			*bucket = bucket.upsert(ty.clone(), Arc::new(collection.with_strategy(Arc::clone(strategy))));
		}
		for (ty, key) in strategy.keyed_exports() {
			let collection = bucket.get(ty).map_or_else(StrategyCollection::default, |c| (**c).clone());
			let collection = collection.with_keyed(ty, key.clone(), Arc::clone(strategy), policy)?;
			*bucket = bucket.upsert(ty.clone(), Arc::new(collection));
		}
		for name in strategy.names() {
			let collection = next.names.get(name).map_or_else(StrategyCollection::default, |c| (**c).clone());
			next.names = next.names.upsert(Arc::clone(name), Arc::new(collection.with_strategy(Arc::clone(strategy))));
		}

		let mut all = self.all.to_vec();
		all.push(Arc::clone(strategy));
		next.all = Arc::from(all);
		Ok(next)
	}

	pub(super) fn with_wrapper(&self, wrapper: Arc<dyn Wrapper>) -> Self {
		let mut next = self.clone();
		next.wrappers = next.wrappers.upsert(wrapper.definition(), wrapper);
		next
	}

	pub(super) fn with_provider(&self, provider: Arc<dyn MissingStrategyProvider>) -> Self {
		let mut next = self.clone();
		let mut providers = self.providers.to_vec();
		providers.push(provider);
		next.providers = Arc::from(providers);
		next
	}
}

fn validate(strategy: &Strategy) -> Result<(), RegistryError> {
	let activation = strategy.activation_type();
	let exported = strategy.exports().iter().chain(strategy.keyed_exports().iter().map(|(ty, _)| ty));

	if let StrategyKind::OpenGeneric(_) = strategy.kind() {
		if let Some(ty) = exported.clone().find(|ty| !matches!(ty, TypeKey::Definition(_))) {
			return Err(RegistryError::NotADefinition {
				ty: ty.clone(),
				activation: activation.clone(),
			});
		}
	}

	if strategy.is_decorator() {
		let supported_kind = matches!(strategy.kind(), StrategyKind::Type(_) | StrategyKind::DecorateFn(_));
		if let Some(ty) = exported.clone().find(|ty| !supported_kind || ty.is_structural()) {
			return Err(RegistryError::UnsupportedDecorator {
				ty: ty.clone(),
				activation: activation.clone(),
			});
		}
	}
	Ok(())
}
