//! Lowers a plan into a tree of closures, built once per cached producer.

use std::sync::Arc;

use super::Step;
use super::frame::{self, Frame};
use crate::activation::PlanNode;
use crate::descriptor::MemberDescriptor;
use crate::error::Result;
use crate::strategy::Strategy;
use crate::types::Instance;

pub(crate) fn lower(plan: &PlanNode) -> Step {
	match plan {
		PlanNode::Constant(value) => {
			let value = Arc::clone(value);
			erase(move |_| Ok(Some(Arc::clone(&value))))
		}
		PlanNode::ScopeRef => erase(|frame| Ok(Some(frame::scope_value(frame)))),
		PlanNode::ContextRef => erase(|frame| Ok(Some(frame::context_value(frame)))),
		PlanNode::StaticContext(context) => {
			let value = frame::static_context_value(context);
			erase(move |_| Ok(Some(Arc::clone(&value))))
		}
		PlanNode::Construct {
			strategy,
			ctor,
			args,
			members,
			disposer,
		} => {
			let strategy = Arc::clone(strategy);
			let ctor = ctor.clone();
			let args: Vec<Step> = args.iter().map(lower).collect();
			let members: Vec<(MemberDescriptor, Step)> = members.iter().map(|(m, plan)| (m.clone(), lower(plan))).collect();
			let disposer = disposer.clone();
			erase(move |frame| {
				frame::activating(frame, strategy.activation_type(), |frame| {
					let mut values = Vec::with_capacity(args.len());
					for arg in &args {
						values.push(arg(frame)?);
					}
					let value = frame::construct(&strategy, &ctor, values)?;
					inject_members(frame, &strategy, &members, &value)
						.map_err(|err| frame::abandon(&strategy, disposer.as_ref(), &value, err))?;
					frame::track(frame, &strategy, disposer.as_ref(), &value);
					Ok(Some(value))
				})
			})
		}
		PlanNode::Factory {
			strategy,
			factory,
			context,
			disposer,
		} => {
			let strategy = Arc::clone(strategy);
			let factory = Arc::clone(factory);
			let context = Arc::clone(context);
			let disposer = disposer.clone();
			erase(move |frame| {
				frame::activating(frame, strategy.activation_type(), |frame| {
					let value = frame::call_factory(frame, &strategy, &factory, &context)?;
					frame::track(frame, &strategy, disposer.as_ref(), &value);
					Ok(Some(value))
				})
			})
		}
		PlanNode::Lifestyle { key, lifestyle, inner } => {
			let key = key.clone();
			let lifestyle = *lifestyle;
			let inner = lower(inner);
			erase(move |frame| frame::lifestyle(frame, &key, lifestyle, |frame| inner(frame)))
		}
		PlanNode::Decorate { strategy, decorate, inner } => {
			let strategy = Arc::clone(strategy);
			let decorate = Arc::clone(decorate);
			let inner = lower(inner);
			erase(move |frame| match inner(frame)? {
				Some(value) => frame::decorate(&strategy, &decorate, value).map(Some),
				None => Ok(None),
			})
		}
		PlanNode::Array(element, elements) => {
			let element = element.clone();
			let steps = lower_all(elements);
			erase(move |frame| Ok(Some(frame::array(&element, run_all(&steps, frame)?))))
		}
		PlanNode::ReadOnly(element, elements) => {
			let element = element.clone();
			let steps = lower_all(elements);
			erase(move |frame| Ok(Some(frame::read_only(&element, run_all(&steps, frame)?))))
		}
		PlanNode::Sequence(element, elements) => {
			let element = element.clone();
			let steps: Arc<[Step]> = Arc::from(lower_all(elements));
			erase(move |frame| {
				let steps = Arc::clone(&steps);
				let produce = frame::defer(frame, move |frame| Ok(run_all(&steps, frame)?.into_iter().flatten().collect::<Vec<_>>()));
				Ok(Some(frame::sequence(&element, produce)))
			})
		}
		PlanNode::Lazy(inner_ty, inner) => {
			let inner_ty = inner_ty.clone();
			let inner = lower(inner);
			erase(move |frame| {
				let inner = Arc::clone(&inner);
				let produce = frame::defer(frame, move |frame| inner(frame));
				Ok(Some(frame::lazy(&inner_ty, produce)))
			})
		}
		PlanNode::Owned(inner_ty, inner) => {
			let inner_ty = inner_ty.clone();
			let inner = lower(inner);
			erase(move |frame| frame::owned(frame, &inner_ty, |frame| inner(frame)))
		}
		PlanNode::Wrap { wrapper, requested, inner } => {
			let wrapper = Arc::clone(wrapper);
			let requested = requested.clone();
			let inner = lower(inner);
			erase(move |frame| match inner(frame)? {
				Some(value) => frame::wrap(wrapper.as_ref(), &requested, value).map(Some),
				None => Ok(None),
			})
		}
		PlanNode::ExtraData {
			key,
			required,
			default,
			context,
		} => {
			let key = key.clone();
			let required = *required;
			let default = default.clone();
			let context = Arc::clone(context);
			erase(move |frame| frame::extra_data(frame, &key, required, default.as_ref(), &context))
		}
		PlanNode::Absent => erase(|_| Ok(None)),
	}
}

fn inject_members(frame: &mut Frame<'_>, strategy: &Strategy, members: &[(MemberDescriptor, Step)], target: &Instance) -> Result<()> {
	for (member, value_of) in members {
		if let Some(injected) = value_of(frame)? {
			frame::inject(strategy, member, target, injected)?;
		}
	}
	Ok(())
}

fn erase<F>(f: F) -> Step
where
	F: Fn(&mut Frame<'_>) -> Result<Option<Instance>> + Send + Sync + 'static,
{
	Arc::new(f)
}

fn lower_all(plans: &[PlanNode]) -> Vec<Step> {
	plans.iter().map(lower).collect()
}

fn run_all(steps: &[Step], frame: &mut Frame<'_>) -> Result<Vec<Option<Instance>>> {
	steps.iter().map(|step| step(frame)).collect()
}
