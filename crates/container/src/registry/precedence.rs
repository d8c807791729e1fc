//! Named tie-break rules.
//!
//! # Role
//!
//! Single-value requests and collection requests order equal-priority strategies in opposite
//! directions. Both rules live here under their own names so neither can silently absorb the
//! other.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::strategy::{Strategy, StrategyFilter};

/// How a keyed export that duplicates an existing key is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
	/// Fail the registration with [`crate::RegistryError::KeyConflict`].
	#[default]
	Reject,
	/// Keep the first strategy registered for the key.
	FirstWins,
	/// Replace with the last strategy registered for the key.
	LastWins,
	/// Keep the winner of [`primary_precedence`].
	ByPriority,
}

/// Precedence for picking the primary of a single-value request.
///
/// 1. Priority (higher wins)
/// 2. Ordinal (later registration wins)
///
/// Returns `Greater` when `a` is preferred over `b`.
pub(crate) fn primary_precedence(a: &Strategy, b: &Strategy) -> Ordering {
	a.priority().cmp(&b.priority()).then_with(|| a.ordinal().cmp(&b.ordinal()))
}

/// Order of strategies in collection results.
///
/// Registration order, except that strategies accepted by `prioritize` move ahead of the rest.
/// Relative order inside each group is preserved.
pub(crate) fn collection_order(strategies: impl IntoIterator<Item = Arc<Strategy>>, prioritize: Option<&StrategyFilter>) -> Vec<Arc<Strategy>> {
	let mut ordered: Vec<Arc<Strategy>> = strategies.into_iter().collect();
	ordered.sort_by_key(|s| s.ordinal());
	if let Some(prioritize) = prioritize {
		// stable: ties keep registration order
		ordered.sort_by_key(|s| !prioritize.matches(s));
	}
	ordered
}

/// Decides whether `incoming` replaces `existing` for a duplicated key.
///
/// `None` means the policy rejects the duplicate.
pub(crate) fn keyed_replaces(policy: DuplicatePolicy, existing: &Strategy, incoming: &Strategy) -> Option<bool> {
	match policy {
		DuplicatePolicy::Reject => None,
		DuplicatePolicy::FirstWins => Some(false),
		DuplicatePolicy::LastWins => Some(true),
		DuplicatePolicy::ByPriority => Some(primary_precedence(incoming, existing) == Ordering::Greater),
	}
}
