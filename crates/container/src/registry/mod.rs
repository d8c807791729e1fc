//! Strategy registry.
//!
//! # Role
//!
//! Maps export types to ordered [`StrategyCollection`]s, with keyed and named lookups and a
//! cached primary per type. Versions are immutable [`RegistrySnapshot`]s built on
//! [`trellis_immutable::ImmutableHashTree`] and published atomically.
//!
//! # Invariants
//!
//! - A collection's primary is always one of its members, or absent when it has none.
//!   - Enforced in: `StrategyCollection::with_strategy`
//!   - Tested by: `tests::test_primary_prefers_priority_then_recency`
//! - Collection order is registration order, with a prioritized group moved to the front.
//!   - Enforced in: `precedence::collection_order`
//!   - Tested by: `tests::test_get_all_keeps_registration_order`
//! - Readers holding a snapshot never observe later publications.
//!   - Tested by: `tests::test_snapshot_survives_publication`

mod block;
mod collection;
mod precedence;
mod runtime;
mod snapshot;

pub use self::block::RegistrationBlock;
pub use self::collection::StrategyCollection;
pub use self::precedence::DuplicatePolicy;
pub(crate) use self::precedence::collection_order;
pub use self::runtime::StrategyRegistry;
pub use self::snapshot::RegistrySnapshot;
