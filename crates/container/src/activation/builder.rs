use std::sync::Arc;

use super::{ActivationRequest, DecoratedSlot, InjectionTarget, PlanNode};
use crate::container::ContainerShared;
use crate::descriptor::{Dependency, MemberDescriptor, TypeDescriptor};
use crate::error::{LocateError, Result};
use crate::lifetime::{LifestyleKey, Scope};
use crate::registry::{RegistrationBlock, RegistrySnapshot, collection_order};
use crate::strategy::{Disposer, Lifestyle, Strategy, StrategyKind};
use crate::types::{LocateKey, TypeKey};

/// Builds plans against one registry snapshot, refreshing it only when providers publish.
pub(crate) struct PlanBuilder<'a> {
	shared: &'a ContainerShared,
	scope: &'a Scope,
	snap: Arc<RegistrySnapshot>,
}

impl<'a> PlanBuilder<'a> {
	pub(crate) fn new(shared: &'a ContainerShared, scope: &'a Scope) -> Self {
		Self {
			shared,
			scope,
			snap: shared.registry.snapshot(),
		}
	}

	/// Generation of the snapshot the plan was built against.
	pub(crate) fn generation(&self) -> u64 {
		self.snap.generation()
	}

	pub(crate) fn build(&mut self, req: &ActivationRequest<'_>) -> Result<PlanNode> {
		if req.depth > self.shared.config.max_depth {
			return Err(LocateError::DependencyCycle { chain: req.chain() });
		}

		match &req.ty {
			TypeKey::Scope => return Ok(PlanNode::ScopeRef),
			TypeKey::Context => return Ok(PlanNode::ContextRef),
			TypeKey::StaticContext => return Ok(PlanNode::StaticContext(Arc::clone(&req.context))),
			_ => {}
		}

		if let Some(slot) = &req.slot
			&& slot.ty == req.ty
		{
			return Ok(slot.plan.clone());
		}

		if let Some(plan) = self.locate_registered(req)? {
			return Ok(plan);
		}
		if let Some(plan) = self.locate_under_lock(req)? {
			return Ok(plan);
		}
		self.fallback(req)
	}

	fn locate_registered(&mut self, req: &ActivationRequest<'_>) -> Result<Option<PlanNode>> {
		if let Some(plan) = self.from_strategies(req)? {
			return Ok(Some(plan));
		}
		if let Some(plan) = self.from_wrappers(req)? {
			return Ok(Some(plan));
		}
		self.from_open_generic(req)
	}

	fn from_strategies(&mut self, req: &ActivationRequest<'_>) -> Result<Option<PlanNode>> {
		let Some(collection) = self.snap.collection(&req.ty).cloned() else {
			return Ok(None);
		};
		let chosen = match &req.key {
			Some(key) => collection.keyed_for(key, &req.context, req.filter.as_ref()),
			None => collection.primary_for(&req.context, req.filter.as_ref()),
		};

		match chosen {
			Some(strategy) => self.activate(req, &strategy, &req.ty).map(Some),
			None if req.key.is_none() && req.required && req.filter.is_some() && !collection.is_empty() => {
				Err(LocateError::AmbiguousPrimary {
					ty: req.ty.clone(),
					candidates: collection.len(),
				})
			}
			None => Ok(None),
		}
	}

	fn from_wrappers(&mut self, req: &ActivationRequest<'_>) -> Result<Option<PlanNode>> {
		let plan = match &req.ty {
			TypeKey::Array(element) => PlanNode::Array((**element).clone(), self.elements(req, element)?),
			TypeKey::ReadOnly(element) => PlanNode::ReadOnly((**element).clone(), self.elements(req, element)?),
			TypeKey::Sequence(element) => PlanNode::Sequence((**element).clone(), Arc::from(self.elements(req, element)?)),
			TypeKey::Lazy(inner) => {
				let child = req.element((**inner).clone());
				match self.build(&child)? {
					PlanNode::Absent => PlanNode::Absent,
					plan => PlanNode::Lazy((**inner).clone(), Arc::new(plan)),
				}
			}
			TypeKey::Owned(inner) => {
				let child = req.element((**inner).clone());
				match self.build(&child)? {
					PlanNode::Absent => PlanNode::Absent,
					plan => PlanNode::Owned((**inner).clone(), Box::new(plan)),
				}
			}
			TypeKey::Generic { .. } => {
				let Some(wrapper) = req.ty.generic_definition().and_then(|def| self.snap.wrapper(&def).cloned()) else {
					return Ok(None);
				};
				let Some(inner) = wrapper.inner_type(&req.ty) else {
					return Ok(None);
				};
				let child = req.element(inner);
				match self.build(&child)? {
					PlanNode::Absent => PlanNode::Absent,
					plan => PlanNode::Wrap {
						wrapper,
						requested: req.ty.clone(),
						inner: Box::new(plan),
					},
				}
			}
			_ => return Ok(None),
		};
		Ok(Some(plan))
	}

	/// Plans every element of a collection request, closed open generics included.
	fn elements(&mut self, req: &ActivationRequest<'_>, element: &TypeKey) -> Result<Vec<PlanNode>> {
		let mut child = req.element(element.clone());
		child.key = None;
		child.required = true;
		child.slot = None;

		let mut strategies: Vec<Arc<Strategy>> = self
			.snap
			.collection(element)
			.map(|c| c.ordered(&child.context, req.filter.as_ref(), None))
			.unwrap_or_default();

		if let Some(open) = element.generic_definition().and_then(|def| self.snap.collection(&def).cloned()) {
			for strategy in open.ordered(&child.context, req.filter.as_ref(), None) {
				if let Some(closed) = self.shared.registry.close_generic(&strategy, element) {
					strategies.push(closed);
				}
			}
		}

		collection_order(strategies, req.prioritize.as_ref())
			.iter()
			.map(|strategy| self.activate(&child, strategy, element))
			.collect()
	}

	fn from_open_generic(&mut self, req: &ActivationRequest<'_>) -> Result<Option<PlanNode>> {
		let Some(collection) = req.ty.generic_definition().and_then(|def| self.snap.collection(&def).cloned()) else {
			return Ok(None);
		};
		let open = match &req.key {
			Some(key) => collection.keyed_for(key, &req.context, req.filter.as_ref()),
			None => collection.primary_for(&req.context, req.filter.as_ref()),
		};
		let Some(closed) = open.and_then(|open| self.shared.registry.close_generic(&open, &req.ty)) else {
			return Ok(None);
		};
		self.activate(req, &closed, &req.ty).map(Some)
	}

	/// Asks missing-strategy providers, then retries against the published snapshot.
	///
	/// The scope's lock covers the retry; provider publication lands in the shared registry,
	/// so it is serialized on the root scope's lock and re-checked once that lock is held.
	fn locate_under_lock(&mut self, req: &ActivationRequest<'_>) -> Result<Option<PlanNode>> {
		let node = Arc::clone(&self.scope.node);
		let _guard = node.activation_lock().lock();
		if let Some(plan) = self.retry_latest(req)? {
			return Ok(Some(plan));
		}

		let root = Arc::clone(&self.shared.root);
		let _publishing = root.activation_lock().lock();
		if let Some(plan) = self.retry_latest(req)? {
			return Ok(Some(plan));
		}

		let mut block = RegistrationBlock::new();
		for provider in self.snap.providers() {
			for config in provider.provide(&req.ty, req.key.as_ref(), &req.context) {
				block.export(config);
			}
		}
		if block.is_empty() {
			return Ok(None);
		}

		tracing::debug!(ty = %req.ty, strategies = block.len(), "missing strategy providers supplied exports");
		self.shared.publish(block)?;
		self.snap = self.shared.registry.snapshot();
		self.locate_registered(req)
	}

	/// Re-plans `req` if a newer snapshot was published since planning began.
	fn retry_latest(&mut self, req: &ActivationRequest<'_>) -> Result<Option<PlanNode>> {
		let latest = self.shared.registry.snapshot();
		if Arc::ptr_eq(&latest, &self.snap) {
			return Ok(None);
		}
		self.snap = latest;
		self.locate_registered(req)
	}

	fn fallback(&self, req: &ActivationRequest<'_>) -> Result<PlanNode> {
		let name = req.key.clone().or_else(|| req.target_name().map(|name| LocateKey::Str(Arc::clone(name))));
		match name {
			Some(key) if req.key.is_some() || !req.required => Ok(PlanNode::ExtraData {
				key,
				required: req.required,
				default: req.default.clone(),
				context: Arc::clone(&req.context),
			}),
			_ if !req.required => Ok(req.default.clone().map_or(PlanNode::Absent, PlanNode::Constant)),
			_ => Err(LocateError::NotLocated(Arc::clone(&req.context))),
		}
	}

	/// Plans `strategy` for `req`, exported as `export`, with lifestyle and decorators.
	fn activate(&mut self, req: &ActivationRequest<'_>, strategy: &Arc<Strategy>, export: &TypeKey) -> Result<PlanNode> {
		if req.is_activating(strategy.id()) {
			return Err(LocateError::DependencyCycle { chain: req.chain() });
		}

		let base = match strategy.kind() {
			StrategyKind::Type(descriptor) => self.construct(req, strategy, descriptor, None)?,
			StrategyKind::Instance(value) => PlanNode::Constant(Arc::clone(value)),
			StrategyKind::Factory(factory) => PlanNode::Factory {
				strategy: Arc::clone(strategy),
				factory: Arc::clone(factory),
				context: Arc::clone(&req.context),
				disposer: self.disposer_for(strategy),
			},
			StrategyKind::OpenGeneric(_) | StrategyKind::DecorateFn(_) => return Err(LocateError::NotLocated(Arc::clone(&req.context))),
		};

		let decorators = self.decorators_for(req, export);
		let lifestyle = strategy.lifestyle();
		if decorators.is_empty() {
			return Ok(with_lifestyle(base, LifestyleKey::new(strategy.id(), None), lifestyle));
		}

		let (after, before): (Vec<_>, Vec<_>) = decorators
			.into_iter()
			.partition(|d| d.decorator_role().is_some_and(|role| role.apply_after_lifestyle));

		let mut plan = base;
		for decorator in &before {
			plan = self.apply_decorator(req, decorator, export, plan)?;
		}
		let decorated_for = (!before.is_empty()).then(|| export.clone());
		plan = with_lifestyle(plan, LifestyleKey::new(strategy.id(), decorated_for), lifestyle);
		for decorator in &after {
			plan = self.apply_decorator(req, decorator, export, plan)?;
		}
		Ok(plan)
	}

	/// Applicable decorators, innermost first.
	fn decorators_for(&self, req: &ActivationRequest<'_>, export: &TypeKey) -> Vec<Arc<Strategy>> {
		let Some(collection) = self.snap.decorators(export) else {
			return Vec::new();
		};
		let mut decorators: Vec<_> = collection.strategies().iter().filter(|d| d.meets_conditions(&req.context)).cloned().collect();
		decorators.sort_by(|a, b| a.priority().cmp(&b.priority()).then(a.ordinal().cmp(&b.ordinal())));
		decorators
	}

	fn apply_decorator(&mut self, req: &ActivationRequest<'_>, decorator: &Arc<Strategy>, export: &TypeKey, inner: PlanNode) -> Result<PlanNode> {
		match decorator.kind() {
			StrategyKind::DecorateFn(decorate) => Ok(PlanNode::Decorate {
				strategy: Arc::clone(decorator),
				decorate: Arc::clone(decorate),
				inner: Box::new(inner),
			}),
			StrategyKind::Type(descriptor) => {
				if req.is_activating(decorator.id()) {
					return Err(LocateError::DependencyCycle { chain: req.chain() });
				}
				let slot = DecoratedSlot {
					ty: export.clone(),
					plan: inner,
				};
				self.construct(req, decorator, descriptor, Some(slot))
			}
			StrategyKind::Instance(_) | StrategyKind::Factory(_) | StrategyKind::OpenGeneric(_) => {
				Err(LocateError::activation(decorator.activation_type(), "decorator must be a type or a function".into()))
			}
		}
	}

	/// Picks the longest constructor whose parameters all plan.
	fn construct(
		&mut self,
		req: &ActivationRequest<'_>,
		strategy: &Arc<Strategy>,
		descriptor: &TypeDescriptor,
		slot: Option<DecoratedSlot>,
	) -> Result<PlanNode> {
		let mut first_failure = None;

		for ctor in descriptor.constructors_by_arity() {
			match self.arguments(req, strategy, &ctor.params, slot.as_ref()) {
				Ok(args) => {
					let members = self.members(req, strategy, descriptor)?;
					return Ok(PlanNode::Construct {
						strategy: Arc::clone(strategy),
						ctor: ctor.clone(),
						args,
						members,
						disposer: self.disposer_for(strategy),
					});
				}
				Err(err @ (LocateError::NotLocated(_) | LocateError::AmbiguousPrimary { .. })) => {
					tracing::trace!(ty = %descriptor.ty, arity = ctor.params.len(), error = %err, "constructor rejected");
					first_failure.get_or_insert(err);
				}
				Err(err) => return Err(err),
			}
		}

		Err(first_failure.unwrap_or_else(|| LocateError::activation(&descriptor.ty, "no constructor described".into())))
	}

	fn arguments(
		&mut self,
		req: &ActivationRequest<'_>,
		strategy: &Arc<Strategy>,
		params: &[Dependency],
		slot: Option<&DecoratedSlot>,
	) -> Result<Vec<PlanNode>> {
		let mut args = Vec::with_capacity(params.len());
		for param in params {
			if let Some(value) = strategy.ctor_value_for(&param.name, &param.ty) {
				args.push(PlanNode::Constant(Arc::clone(value)));
				continue;
			}
			let mut child = req.dependency(
				param,
				InjectionTarget::ConstructorParameter(Arc::clone(&param.name)),
				strategy.id(),
				strategy.activation_type(),
			);
			child.slot = slot.cloned();
			args.push(self.build(&child)?);
		}
		Ok(args)
	}

	fn members(
		&mut self,
		req: &ActivationRequest<'_>,
		strategy: &Arc<Strategy>,
		descriptor: &TypeDescriptor,
	) -> Result<Vec<(MemberDescriptor, PlanNode)>> {
		let mut members = Vec::new();
		for member in descriptor.members.iter().filter(|m| strategy.member_selector().selects(m)) {
			let mut dependency = member.dependency.clone();
			dependency.required &= member.always;
			let child = req.dependency(
				&dependency,
				InjectionTarget::Member(Arc::clone(&member.name)),
				strategy.id(),
				strategy.activation_type(),
			);
			let plan = self.build(&child)?;
			if !matches!(plan, PlanNode::Absent) {
				members.push((member.clone(), plan));
			}
		}
		Ok(members)
	}

	fn disposer_for(&self, strategy: &Strategy) -> Option<Disposer> {
		if strategy.is_externally_owned() {
			return None;
		}
		if strategy.lifestyle() == Lifestyle::Transient && !self.shared.config.track_transient_disposal {
			return None;
		}
		strategy.disposer().cloned()
	}
}

fn with_lifestyle(plan: PlanNode, key: LifestyleKey, lifestyle: Lifestyle) -> PlanNode {
	if lifestyle == Lifestyle::Transient || matches!(plan, PlanNode::Constant(_)) {
		return plan;
	}
	PlanNode::Lifestyle {
		key,
		lifestyle,
		inner: Box::new(plan),
	}
}
