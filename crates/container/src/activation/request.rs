use std::sync::Arc;

use super::{InjectionTarget, InjectionTargetInfo, PlanNode, StaticInjectionContext};
use crate::descriptor::Dependency;
use crate::strategy::{StrategyFilter, StrategyId};
use crate::types::{Instance, LocateKey, TypeKey};

/// Decorated value waiting to be handed to the decorator that requests it.
#[derive(Clone, Debug)]
pub(crate) struct DecoratedSlot {
	pub(crate) ty: TypeKey,
	pub(crate) plan: PlanNode,
}

/// One node of the request tree built while planning a top-level resolution.
///
/// Requests borrow their parent, so a tree never outlives the build that created it.
pub struct ActivationRequest<'p> {
	pub(crate) ty: TypeKey,
	pub(crate) key: Option<LocateKey>,
	pub(crate) filter: Option<StrategyFilter>,
	pub(crate) prioritize: Option<StrategyFilter>,
	pub(crate) required: bool,
	pub(crate) default: Option<Instance>,
	pub(crate) context: Arc<StaticInjectionContext>,
	pub(crate) parent: Option<&'p ActivationRequest<'p>>,
	/// Strategy whose dependencies this request resolves.
	pub(crate) owner: Option<StrategyId>,
	pub(crate) depth: usize,
	pub(crate) slot: Option<DecoratedSlot>,
}

impl<'p> ActivationRequest<'p> {
	/// Top-level request.
	pub(crate) fn root(ty: TypeKey, key: Option<LocateKey>) -> Self {
		let context = Arc::new(StaticInjectionContext::root(ty.clone()));
		Self {
			ty,
			key,
			filter: None,
			prioritize: None,
			required: true,
			default: None,
			context,
			parent: None,
			owner: None,
			depth: 0,
			slot: None,
		}
	}

	pub(crate) fn with_filter(mut self, filter: Option<StrategyFilter>) -> Self {
		self.filter = filter;
		self
	}

	pub(crate) fn with_prioritize(mut self, prioritize: Option<StrategyFilter>) -> Self {
		self.prioritize = prioritize;
		self
	}

	/// Child request for a dependency of the strategy `owner` activated as `requesting`.
	pub(crate) fn dependency(&'p self, dependency: &Dependency, target: InjectionTarget, owner: StrategyId, requesting: &TypeKey) -> Self {
		let context = Arc::new(self.context.push(InjectionTargetInfo {
			locate_type: dependency.ty.clone(),
			requesting_type: Some(requesting.clone()),
			target,
		}));
		Self {
			ty: dependency.ty.clone(),
			key: dependency.key.clone(),
			filter: None,
			prioritize: None,
			required: dependency.required,
			default: dependency.default.clone(),
			context,
			parent: Some(self),
			owner: Some(owner),
			depth: self.depth + 1,
			slot: None,
		}
	}

	/// Child request for the element or inner value of a structural shape.
	///
	/// Filter, key and decorated slot carry over; the requirement is kept for single-value
	/// shapes and dropped for collection elements.
	pub(crate) fn element(&'p self, ty: TypeKey) -> Self {
		let context = Arc::new(self.context.push(InjectionTargetInfo {
			locate_type: ty.clone(),
			requesting_type: Some(self.ty.clone()),
			target: InjectionTarget::Element,
		}));
		Self {
			ty,
			key: self.key.clone(),
			filter: self.filter.clone(),
			prioritize: self.prioritize.clone(),
			required: self.required,
			default: None,
			context,
			parent: Some(self),
			owner: self.owner,
			depth: self.depth + 1,
			slot: self.slot.clone(),
		}
	}

	pub fn ty(&self) -> &TypeKey {
		&self.ty
	}

	pub fn key(&self) -> Option<&LocateKey> {
		self.key.as_ref()
	}

	pub fn is_required(&self) -> bool {
		self.required
	}

	pub fn static_context(&self) -> &StaticInjectionContext {
		&self.context
	}

	pub fn parent(&self) -> Option<&ActivationRequest<'p>> {
		self.parent
	}

	/// Ancestors from this request up to the top-level one.
	pub fn ancestors(&self) -> impl Iterator<Item = &ActivationRequest<'p>> {
		std::iter::successors(Some(self), |r| r.parent)
	}

	/// Returns true if `strategy` is already being activated further up the chain.
	pub(crate) fn is_activating(&self, strategy: StrategyId) -> bool {
		self.ancestors().any(|r| r.owner == Some(strategy))
	}

	/// Requested types from the top-level request down to this one.
	pub(crate) fn chain(&self) -> Vec<TypeKey> {
		let mut chain: Vec<TypeKey> = self.ancestors().map(|r| r.ty.clone()).collect();
		chain.reverse();
		chain
	}

	/// Name used for extra-data fallback when the request has no key.
	pub(crate) fn target_name(&self) -> Option<&Arc<str>> {
		match &self.context.target_info()?.target {
			InjectionTarget::ConstructorParameter(name) | InjectionTarget::Member(name) => Some(name),
			InjectionTarget::Root | InjectionTarget::Element => None,
		}
	}
}
