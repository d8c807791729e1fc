use std::fmt;
use std::sync::Arc;

use super::{StaticInjectionContext, Wrapper};
use crate::descriptor::{ConstructorDescriptor, MemberDescriptor};
use crate::lifetime::LifestyleKey;
use crate::strategy::{DecorateFn, Disposer, FactoryFn, Lifestyle, Strategy};
use crate::types::{Instance, LocateKey, TypeKey};

/// Resolved, not yet executable description of how to produce one value.
#[derive(Clone)]
pub enum PlanNode {
	/// Fixed value: instance exports and constructor overrides.
	Constant(Instance),
	/// The invoking scope.
	ScopeRef,
	/// The live injection context.
	ContextRef,
	/// The static context captured for this request.
	StaticContext(Arc<StaticInjectionContext>),
	/// Run a constructor, then inject the selected members.
	Construct {
		strategy: Arc<Strategy>,
		ctor: ConstructorDescriptor,
		args: Vec<PlanNode>,
		members: Vec<(MemberDescriptor, PlanNode)>,
		/// Set when the produced value must be tracked for disposal.
		disposer: Option<Disposer>,
	},
	/// Call a user factory.
	Factory {
		strategy: Arc<Strategy>,
		factory: FactoryFn,
		context: Arc<StaticInjectionContext>,
		disposer: Option<Disposer>,
	},
	/// Reuse the value according to a lifestyle.
	Lifestyle {
		key: LifestyleKey,
		lifestyle: Lifestyle,
		inner: Box<PlanNode>,
	},
	/// Function decorator around the inner value.
	Decorate {
		strategy: Arc<Strategy>,
		decorate: DecorateFn,
		inner: Box<PlanNode>,
	},
	/// Collection of the element type.
	Array(TypeKey, Vec<PlanNode>),
	/// Elements evaluated on first iteration.
	Sequence(TypeKey, Arc<[PlanNode]>),
	ReadOnly(TypeKey, Vec<PlanNode>),
	/// Value of the inner type, evaluated on first access.
	Lazy(TypeKey, Arc<PlanNode>),
	/// Value whose disposal is bound to the produced handle.
	Owned(TypeKey, Box<PlanNode>),
	/// User wrapper around the inner value.
	Wrap {
		wrapper: Arc<dyn Wrapper>,
		requested: TypeKey,
		inner: Box<PlanNode>,
	},
	/// Runtime lookup in the injection context's extra data.
	ExtraData {
		key: LocateKey,
		required: bool,
		default: Option<Instance>,
		context: Arc<StaticInjectionContext>,
	},
	/// Optional request with nothing to supply.
	Absent,
}

/// Ambient requirements of a plan; part of the compiled producer's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanShape {
	/// The plan reads or writes the live injection context.
	pub needs_context: bool,
}

impl PlanNode {
	pub fn shape(&self) -> PlanShape {
		PlanShape {
			needs_context: self.needs_context(),
		}
	}

	pub fn needs_context(&self) -> bool {
		match self {
			Self::ContextRef | Self::ExtraData { .. } | Self::Factory { .. } => true,
			Self::Lifestyle {
				lifestyle: Lifestyle::SingletonPerObjectGraph,
				..
			} => true,
			Self::Lifestyle { inner, .. } | Self::Decorate { inner, .. } | Self::Owned(_, inner) | Self::Wrap { inner, .. } => {
				inner.needs_context()
			}
			Self::Construct { args, members, .. } => args.iter().chain(members.iter().map(|(_, m)| m)).any(Self::needs_context),
			Self::Array(_, elements) | Self::ReadOnly(_, elements) => elements.iter().any(Self::needs_context),
			Self::Sequence(_, elements) => elements.iter().any(Self::needs_context),
			Self::Lazy(_, inner) => inner.needs_context(),
			Self::Constant(_) | Self::ScopeRef | Self::StaticContext(_) | Self::Absent => false,
		}
	}

	/// Number of nodes in the plan.
	pub fn node_count(&self) -> usize {
		1 + match self {
			Self::Lifestyle { inner, .. } | Self::Decorate { inner, .. } | Self::Owned(_, inner) | Self::Wrap { inner, .. } => inner.node_count(),
			Self::Construct { args, members, .. } => args.iter().chain(members.iter().map(|(_, m)| m)).map(Self::node_count).sum(),
			Self::Array(_, elements) | Self::ReadOnly(_, elements) => elements.iter().map(Self::node_count).sum(),
			Self::Sequence(_, elements) => elements.iter().map(Self::node_count).sum(),
			Self::Lazy(_, inner) => inner.node_count(),
			_ => 0,
		}
	}

	fn label(&self) -> &'static str {
		match self {
			Self::Constant(_) => "constant",
			Self::ScopeRef => "scope",
			Self::ContextRef => "context",
			Self::StaticContext(_) => "static_context",
			Self::Construct { .. } => "construct",
			Self::Factory { .. } => "factory",
			Self::Lifestyle { .. } => "lifestyle",
			Self::Decorate { .. } => "decorate",
			Self::Array(..) => "array",
			Self::Sequence(..) => "sequence",
			Self::ReadOnly(..) => "read_only",
			Self::Lazy(..) => "lazy",
			Self::Owned(..) => "owned",
			Self::Wrap { .. } => "wrap",
			Self::ExtraData { .. } => "extra_data",
			Self::Absent => "absent",
		}
	}
}

impl fmt::Debug for PlanNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Construct { strategy, args, members, .. } => f
				.debug_struct("Construct")
				.field("strategy", &strategy.to_string())
				.field("args", args)
				.field("members", &members.iter().map(|(m, p)| (&m.name, p)).collect::<Vec<_>>())
				.finish(),
			Self::Lifestyle { key, lifestyle, inner } => f
				.debug_struct("Lifestyle")
				.field("key", key)
				.field("lifestyle", lifestyle)
				.field("inner", inner)
				.finish(),
			Self::Decorate { inner, .. } | Self::Owned(_, inner) | Self::Wrap { inner, .. } => f.debug_tuple(self.label()).field(inner).finish(),
			Self::Array(ty, elements) | Self::ReadOnly(ty, elements) => f.debug_tuple(self.label()).field(ty).field(elements).finish(),
			Self::Sequence(ty, elements) => f.debug_tuple(self.label()).field(ty).field(elements).finish(),
			Self::Lazy(ty, inner) => f.debug_tuple(self.label()).field(ty).field(inner).finish(),
			Self::ExtraData { key, required, .. } => f.debug_struct("ExtraData").field("key", key).field("required", required).finish(),
			_ => f.write_str(self.label()),
		}
	}
}
