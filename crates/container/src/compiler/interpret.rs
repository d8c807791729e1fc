//! Walks a plan directly on every invocation.

use std::sync::Arc;

use super::frame::{self, Frame};
use crate::activation::PlanNode;
use crate::descriptor::MemberDescriptor;
use crate::error::Result;
use crate::strategy::Strategy;
use crate::types::Instance;

pub(crate) fn execute(plan: &PlanNode, frame: &mut Frame<'_>) -> Result<Option<Instance>> {
	match plan {
		PlanNode::Constant(value) => Ok(Some(Arc::clone(value))),
		PlanNode::ScopeRef => Ok(Some(frame::scope_value(frame))),
		PlanNode::ContextRef => Ok(Some(frame::context_value(frame))),
		PlanNode::StaticContext(context) => Ok(Some(frame::static_context_value(context))),
		PlanNode::Construct {
			strategy,
			ctor,
			args,
			members,
			disposer,
		} => frame::activating(frame, strategy.activation_type(), |frame| {
			let values = execute_all(args, frame)?;
			let value = frame::construct(strategy, ctor, values)?;
			inject_members(frame, strategy, members, &value).map_err(|err| frame::abandon(strategy, disposer.as_ref(), &value, err))?;
			frame::track(frame, strategy, disposer.as_ref(), &value);
			Ok(Some(value))
		}),
		PlanNode::Factory {
			strategy,
			factory,
			context,
			disposer,
		} => frame::activating(frame, strategy.activation_type(), |frame| {
			let value = frame::call_factory(frame, strategy, factory, context)?;
			frame::track(frame, strategy, disposer.as_ref(), &value);
			Ok(Some(value))
		}),
		PlanNode::Lifestyle { key, lifestyle, inner } => frame::lifestyle(frame, key, *lifestyle, |frame| execute(inner, frame)),
		PlanNode::Decorate { strategy, decorate, inner } => match execute(inner, frame)? {
			Some(value) => frame::decorate(strategy, decorate, value).map(Some),
			None => Ok(None),
		},
		PlanNode::Array(element, elements) => Ok(Some(frame::array(element, execute_all(elements, frame)?))),
		PlanNode::ReadOnly(element, elements) => Ok(Some(frame::read_only(element, execute_all(elements, frame)?))),
		PlanNode::Sequence(element, elements) => {
			let elements = Arc::clone(elements);
			let produce = frame::defer(frame, move |frame| Ok(execute_all(&elements, frame)?.into_iter().flatten().collect::<Vec<_>>()));
			Ok(Some(frame::sequence(element, produce)))
		}
		PlanNode::Lazy(inner_ty, inner) => {
			let inner = Arc::clone(inner);
			let produce = frame::defer(frame, move |frame| execute(&inner, frame));
			Ok(Some(frame::lazy(inner_ty, produce)))
		}
		PlanNode::Owned(inner_ty, inner) => frame::owned(frame, inner_ty, |frame| execute(inner, frame)),
		PlanNode::Wrap { wrapper, requested, inner } => match execute(inner, frame)? {
			Some(value) => frame::wrap(wrapper.as_ref(), requested, value).map(Some),
			None => Ok(None),
		},
		PlanNode::ExtraData {
			key,
			required,
			default,
			context,
		} => frame::extra_data(frame, key, *required, default.as_ref(), context),
		PlanNode::Absent => Ok(None),
	}
}

fn inject_members(frame: &mut Frame<'_>, strategy: &Strategy, members: &[(MemberDescriptor, PlanNode)], target: &Instance) -> Result<()> {
	for (member, plan) in members {
		if let Some(injected) = execute(plan, frame)? {
			frame::inject(strategy, member, target, injected)?;
		}
	}
	Ok(())
}

fn execute_all(plans: &[PlanNode], frame: &mut Frame<'_>) -> Result<Vec<Option<Instance>>> {
	plans.iter().map(|plan| execute(plan, frame)).collect()
}
