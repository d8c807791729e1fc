//! Request planning.
//!
//! # Role
//!
//! Turns a top-level request into a [`PlanNode`] tree by walking the request tree: known
//! values, registered strategies, structural wrappers, open generics, missing-strategy
//! providers and finally extra-data fallback, in that order. Plans are later compiled into
//! producers by [`crate::compiler`].
//!
//! # Invariants
//!
//! - A strategy is never activated twice on one request path.
//!   - Enforced in: `PlanBuilder::activate`
//!   - Tested by: `tests::test_cycle_is_reported_with_chain`
//! - Conditions are evaluated against the context of the request being planned.
//!   - Tested by: `tests::test_condition_selects_by_requesting_type`
//! - A required, unkeyed request with nothing to supply fails while planning.
//!   - Tested by: `tests::test_missing_required_dependency_names_the_chain`
//! - Missing-strategy providers are consulted under the scope's activation lock, and what
//!   they return is published before the retry.
//!   - Enforced in: `PlanBuilder::locate_under_lock`
//!   - Tested by: `tests::test_provider_registers_missing_type`

mod builder;
mod context;
mod missing;
mod plan;
mod request;
mod wrappers;

pub(crate) use self::builder::PlanBuilder;
pub use self::context::{InjectionContext, InjectionTarget, InjectionTargetInfo, StaticInjectionContext};
pub use self::missing::{DescriptorCatalog, MissingStrategyProvider};
pub use self::plan::{PlanNode, PlanShape};
pub use self::request::ActivationRequest;
pub(crate) use self::request::DecoratedSlot;
pub use self::wrappers::Wrapper;

#[cfg(test)]
mod tests;
