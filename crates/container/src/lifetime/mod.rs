//! Lifetime and disposal scopes.
//!
//! # Role
//!
//! Scopes form a tree rooted at the container. Each node owns a singleton cache, a disposal
//! list and the activation lock used for first-time resolution of unseen types. Nodes live
//! in an arena addressed by [`ScopeId`]; parents and children refer to each other by id so
//! there are no ownership cycles.
//!
//! # Invariants
//!
//! - A scope's singleton cache is never visible to siblings or ancestors.
//!   - Tested by: `tests::test_per_scope_instances_are_isolated`
//! - Disposal within a scope runs in strict reverse registration order.
//!   - Enforced in: `DisposalList::dispose_all`
//!   - Tested by: `tests::test_disposal_runs_in_reverse_order`
//! - Ending a scope ends its live children first, and a disposed scope refuses resolution.
//!   - Tested by: `tests::test_ending_parent_ends_children`

mod arena;
mod disposal;
mod scope;
mod singleton;

use std::fmt;

pub(crate) use self::arena::{ScopeArena, ScopeNode};
pub(crate) use self::disposal::DisposalList;
pub use self::scope::Scope;
use crate::strategy::StrategyId;
use crate::types::TypeKey;

/// Index of a scope node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
	pub fn index(self) -> usize {
		self.0
	}
}

impl fmt::Display for ScopeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Identity of a lifestyle-cached value.
///
/// Decorated values are cached per exported type because the decoration differs per export.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LifestyleKey {
	pub strategy: StrategyId,
	pub decorated_for: Option<TypeKey>,
}

impl LifestyleKey {
	pub fn new(strategy: StrategyId, decorated_for: Option<TypeKey>) -> Self {
		Self { strategy, decorated_for }
	}
}
