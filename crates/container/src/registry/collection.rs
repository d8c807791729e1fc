use std::cmp::Ordering;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::precedence::{DuplicatePolicy, collection_order, keyed_replaces, primary_precedence};
use crate::activation::StaticInjectionContext;
use crate::error::RegistryError;
use crate::strategy::{Strategy, StrategyFilter};
use crate::types::{LocateKey, TypeKey};

/// All strategies exporting one type.
///
/// Collections are values: adding a strategy returns a new collection and the snapshot
/// that held the old one is unaffected.
#[derive(Clone, Default)]
pub struct StrategyCollection {
	/// Unkeyed exports in registration order.
	strategies: Vec<Arc<Strategy>>,
	keyed: FxHashMap<LocateKey, Arc<Strategy>>,
	/// Cached winner of [`primary_precedence`] over `strategies`.
	primary: Option<Arc<Strategy>>,
	conditional: bool,
}

impl StrategyCollection {
	pub fn len(&self) -> usize {
		self.strategies.len()
	}

	pub fn is_empty(&self) -> bool {
		self.strategies.is_empty() && self.keyed.is_empty()
	}

	/// Unkeyed strategies in registration order.
	pub fn strategies(&self) -> &[Arc<Strategy>] {
		&self.strategies
	}

	/// Primary strategy ignoring conditions.
	pub fn primary(&self) -> Option<&Arc<Strategy>> {
		self.primary.as_ref()
	}

	pub fn keyed(&self, key: &LocateKey) -> Option<&Arc<Strategy>> {
		self.keyed.get(key)
	}

	pub fn keyed_entries(&self) -> impl Iterator<Item = (&LocateKey, &Arc<Strategy>)> {
		self.keyed.iter()
	}

	/// Returns true if any unkeyed member carries conditions.
	pub fn is_conditional(&self) -> bool {
		self.conditional
	}

	/// Primary for a request, honoring conditions and an optional filter.
	///
	/// Without either, the cached primary is returned.
	pub fn primary_for(&self, context: &StaticInjectionContext, filter: Option<&StrategyFilter>) -> Option<Arc<Strategy>> {
		if !self.conditional && filter.is_none() {
			return self.primary.clone();
		}
		self.strategies
			.iter()
			.filter(|s| s.meets_conditions(context) && filter.is_none_or(|f| f.matches(s)))
			.max_by(|a, b| primary_precedence(a, b))
			.cloned()
	}

	/// Keyed strategy for a request, honoring conditions and an optional filter.
	pub fn keyed_for(&self, key: &LocateKey, context: &StaticInjectionContext, filter: Option<&StrategyFilter>) -> Option<Arc<Strategy>> {
		self.keyed
			.get(key)
			.filter(|s| s.meets_conditions(context) && filter.is_none_or(|f| f.matches(s)))
			.cloned()
	}

	/// Members in collection order, after conditions and filter.
	pub fn ordered(&self, context: &StaticInjectionContext, filter: Option<&StrategyFilter>, prioritize: Option<&StrategyFilter>) -> Vec<Arc<Strategy>> {
		collection_order(
			self.strategies
				.iter()
				.filter(|s| s.meets_conditions(context) && filter.is_none_or(|f| f.matches(s)))
				.cloned(),
			prioritize,
		)
	}

	pub(crate) fn with_strategy(&self, strategy: Arc<Strategy>) -> Self {
		let mut next = self.clone();
		let replaces_primary = next
			.primary
			.as_ref()
			.is_none_or(|current| primary_precedence(&strategy, current) == Ordering::Greater);
		if replaces_primary {
			next.primary = Some(Arc::clone(&strategy));
		}
		next.conditional |= strategy.has_conditions();
		next.strategies.push(strategy);
		next
	}

	pub(crate) fn with_keyed(&self, ty: &TypeKey, key: LocateKey, strategy: Arc<Strategy>, policy: DuplicatePolicy) -> Result<Self, RegistryError> {
		let mut next = self.clone();
		match next.keyed.get(&key) {
			None => {
				next.keyed.insert(key, strategy);
			}
			Some(existing) => match keyed_replaces(policy, existing, &strategy) {
				None => {
					return Err(RegistryError::KeyConflict {
						ty: ty.clone(),
						key,
						existing: existing.activation_type().clone(),
					});
				}
				Some(true) => {
					next.keyed.insert(key, strategy);
				}
				Some(false) => {}
			},
		}
		Ok(next)
	}
}
