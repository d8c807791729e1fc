//! Execution state and the operations shared by both execution modes.

use std::sync::Arc;

use crate::activation::{InjectionContext, StaticInjectionContext, Wrapper};
use crate::descriptor::{Arguments, ConstructorDescriptor, MemberDescriptor};
use crate::error::{LocateError, Result};
use crate::handles::{Deferred, InstanceList, Lazy, Owned, ReadOnlyList, Sequence};
use crate::lifetime::{DisposalList, LifestyleKey, Scope};
use crate::strategy::{DecorateFn, Disposer, FactoryFn, Lifestyle, Strategy};
use crate::types::{Instance, LocateKey, TypeKey, instance};

/// State threaded through one execution of a plan.
pub(crate) struct Frame<'a> {
	/// Scope the value is produced for.
	pub(crate) scope: &'a Scope,
	pub(crate) context: &'a mut InjectionContext,
	/// Where produced disposables are tracked.
	pub(crate) disposal: Arc<DisposalList>,
}

impl<'a> Frame<'a> {
	pub(crate) fn new(scope: &'a Scope, context: &'a mut InjectionContext) -> Self {
		Self {
			scope,
			disposal: Arc::clone(&scope.node.disposal),
			context,
		}
	}
}

/// Runs `body` with `ty` pushed on the context's activation stack.
pub(crate) fn activating(
	frame: &mut Frame<'_>,
	ty: &TypeKey,
	body: impl FnOnce(&mut Frame<'_>) -> Result<Option<Instance>>,
) -> Result<Option<Instance>> {
	frame.context.enter(ty);
	let result = body(frame);
	frame.context.leave();
	result
}

pub(crate) fn scope_value(frame: &Frame<'_>) -> Instance {
	instance(frame.scope.clone())
}

/// Snapshot of the live context at the point of injection.
pub(crate) fn context_value(frame: &Frame<'_>) -> Instance {
	instance(frame.context.clone())
}

pub(crate) fn static_context_value(context: &Arc<StaticInjectionContext>) -> Instance {
	Arc::clone(context) as Instance
}

pub(crate) fn construct(strategy: &Strategy, ctor: &ConstructorDescriptor, values: Vec<Option<Instance>>) -> Result<Instance> {
	let args = Arguments::new(Arc::clone(&ctor.params), values);
	(ctor.construct)(&args).map_err(|err| LocateError::activation(strategy.activation_type(), err))
}

pub(crate) fn inject(strategy: &Strategy, member: &MemberDescriptor, target: &Instance, value: Instance) -> Result<()> {
	(member.inject)(target, value).map_err(|err| LocateError::activation(strategy.activation_type(), err))
}

/// Disposes a constructed value whose member injection failed and hands back the failure.
pub(crate) fn abandon(strategy: &Strategy, disposer: Option<&Disposer>, value: &Instance, err: LocateError) -> LocateError {
	if let Some(disposer) = disposer
		&& let Err(failure) = disposer(value)
	{
		tracing::warn!(ty = %strategy.activation_type(), error = %failure, "disposing a partly injected instance failed");
	}
	err
}

pub(crate) fn call_factory(
	frame: &mut Frame<'_>,
	strategy: &Strategy,
	factory: &FactoryFn,
	context: &StaticInjectionContext,
) -> Result<Instance> {
	factory(frame.scope, context, frame.context).map_err(|err| LocateError::activation(strategy.activation_type(), err))
}

pub(crate) fn track(frame: &Frame<'_>, strategy: &Strategy, disposer: Option<&Disposer>, value: &Instance) {
	if let Some(disposer) = disposer {
		frame.disposal.track(strategy.activation_type(), value, disposer);
	}
}

pub(crate) fn decorate(strategy: &Strategy, decorator: &DecorateFn, value: Instance) -> Result<Instance> {
	decorator(value).map_err(|err| LocateError::activation(strategy.activation_type(), err))
}

pub(crate) fn wrap(wrapper: &dyn Wrapper, requested: &TypeKey, value: Instance) -> Result<Instance> {
	wrapper.wrap(requested, value).map_err(|err| LocateError::activation(requested, err))
}

pub(crate) fn extra_data(
	frame: &Frame<'_>,
	key: &LocateKey,
	required: bool,
	default: Option<&Instance>,
	context: &Arc<StaticInjectionContext>,
) -> Result<Option<Instance>> {
	match frame.context.extra_data(key).or(default) {
		Some(value) => Ok(Some(Arc::clone(value))),
		None if required => Err(LocateError::NotLocated(Arc::clone(context))),
		None => Ok(None),
	}
}

/// Reuses or creates a value according to `lifestyle`.
///
/// Singletons are produced against the root scope and tracked there; per-scope values
/// against the invoking scope.
pub(crate) fn lifestyle(
	frame: &mut Frame<'_>,
	key: &LifestyleKey,
	lifestyle: Lifestyle,
	create: impl FnOnce(&mut Frame<'_>) -> Result<Option<Instance>>,
) -> Result<Option<Instance>> {
	match lifestyle {
		Lifestyle::Transient => create(frame),
		Lifestyle::Singleton => {
			let root = frame.scope.root();
			let mut nested = Frame::new(&root, &mut *frame.context);
			root.node.singletons.get_or_try_insert(key, || create(&mut nested))
		}
		Lifestyle::SingletonPerScope => {
			let scope = frame.scope;
			let mut nested = Frame::new(scope, &mut *frame.context);
			scope.node.singletons.get_or_try_insert(key, || create(&mut nested))
		}
		Lifestyle::SingletonPerObjectGraph => {
			if let Some(value) = frame.context.graph_instance(key) {
				return Ok(Some(value));
			}
			let value = create(frame)?;
			if let Some(value) = &value {
				frame.context.store_graph_instance(key.clone(), Arc::clone(value));
			}
			Ok(value)
		}
	}
}

/// Produces the inner value with its own disposal list and hands both to an [`Owned`].
pub(crate) fn owned(
	frame: &mut Frame<'_>,
	inner: &TypeKey,
	create: impl FnOnce(&mut Frame<'_>) -> Result<Option<Instance>>,
) -> Result<Option<Instance>> {
	let disposal = Arc::new(DisposalList::default());
	let mut nested = Frame {
		scope: frame.scope,
		context: &mut *frame.context,
		disposal: Arc::clone(&disposal),
	};
	let Some(value) = create(&mut nested)? else {
		return Ok(None);
	};
	Ok(Some(instance(Owned::new(inner.clone(), value, disposal))))
}

pub(crate) fn array(element: &TypeKey, values: Vec<Option<Instance>>) -> Instance {
	instance(InstanceList::new(element.clone(), values.into_iter().flatten().collect::<Vec<_>>()))
}

pub(crate) fn read_only(element: &TypeKey, values: Vec<Option<Instance>>) -> Instance {
	instance(ReadOnlyList::new(InstanceList::new(element.clone(), values.into_iter().flatten().collect::<Vec<_>>())))
}

/// Captures what a deferred evaluation needs once the current frame is gone.
///
/// The deferred body sees the caller's extra data but a fresh activation stack and object
/// graph, and tracks disposables where the current frame does.
pub(crate) fn defer<R: 'static>(frame: &Frame<'_>, body: impl Fn(&mut Frame<'_>) -> Result<R> + Send + Sync + 'static) -> Deferred<R> {
	let scope = frame.scope.clone();
	let context = frame.context.detached();
	let disposal = Arc::clone(&frame.disposal);
	Arc::new(move || {
		scope.ensure_live()?;
		let mut context = context.clone();
		let mut deferred = Frame {
			scope: &scope,
			context: &mut context,
			disposal: Arc::clone(&disposal),
		};
		body(&mut deferred)
	})
}

pub(crate) fn lazy(inner: &TypeKey, produce: Deferred<Option<Instance>>) -> Instance {
	instance(Lazy::new(inner.clone(), produce))
}

pub(crate) fn sequence(element: &TypeKey, produce: Deferred<Vec<Instance>>) -> Instance {
	instance(Sequence::new(element.clone(), produce))
}
