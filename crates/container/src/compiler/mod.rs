//! Plan compilation and the producer cache.
//!
//! # Role
//!
//! A [`PlanNode`] tree is turned into a [`CompiledProducer`] once per unfiltered top-level
//! request and cached by requested type and key. Compiled mode lowers the plan into nested
//! closures; interpreted mode walks the plan on every call. Both share the operations in
//! [`frame`], so they agree on lifestyles, disposal tracking and failures.
//!
//! # Invariants
//!
//! - A producer that never touches the injection context is built as a scope-only
//!   procedure; only context-shaped producers receive the caller's context.
//!   - Enforced in: `CompiledProducer::compile`
//!   - Tested by: `tests::test_context_free_plans_compile_scoped`
//! - Cached producers belong to one registry generation; publication invalidates them.
//!   - Enforced in: `ProducerCache::get`
//!   - Tested by: `tests::test_publication_invalidates_cached_producers`
//! - Failed builds are never cached.
//!   - Tested by: `tests::test_failures_are_not_cached`
//! - Both execution modes produce the same values for the same plan.
//!   - Tested by: `tests::test_modes_agree`

mod cache;
mod closure;
mod frame;
mod interpret;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub(crate) use self::cache::ProducerCache;
use self::frame::Frame;
use crate::activation::{InjectionContext, PlanNode, PlanShape};
use crate::error::Result;
use crate::lifetime::Scope;
use crate::types::{Instance, LocateKey, TypeKey};

/// How plans are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
	/// Lower plans into closures once.
	#[default]
	Compiled,
	/// Walk the plan on every call.
	Interpreted,
}

/// One executable node of a lowered plan.
pub(crate) type Step = Arc<dyn Fn(&mut Frame<'_>) -> Result<Option<Instance>> + Send + Sync>;

type ScopedFn = Arc<dyn Fn(&Scope) -> Result<Option<Instance>> + Send + Sync>;
type ContextualFn = Arc<dyn Fn(&Scope, &mut InjectionContext) -> Result<Option<Instance>> + Send + Sync>;

enum Procedure {
	/// Needs only the invoking scope.
	Scoped(ScopedFn),
	/// Also reads or writes the caller's injection context.
	Contextual(ContextualFn),
}

/// Executable form of a plan for one `(type, key)` request.
pub(crate) struct CompiledProducer {
	ty: TypeKey,
	key: Option<LocateKey>,
	shape: PlanShape,
	generation: u64,
	nodes: usize,
	procedure: Procedure,
}

impl CompiledProducer {
	pub(crate) fn compile(ty: TypeKey, key: Option<LocateKey>, generation: u64, plan: PlanNode, mode: ExecutionMode) -> Self {
		let shape = plan.shape();
		let nodes = plan.node_count();
		let step: Step = match mode {
			ExecutionMode::Compiled => closure::lower(&plan),
			ExecutionMode::Interpreted => {
				let plan = Arc::new(plan);
				Arc::new(move |frame: &mut Frame<'_>| interpret::execute(&plan, frame))
			}
		};

		let procedure = if shape.needs_context {
			Procedure::Contextual(Arc::new(move |scope: &Scope, context: &mut InjectionContext| {
				step(&mut Frame::new(scope, context))
			}))
		} else {
			Procedure::Scoped(Arc::new(move |scope: &Scope| {
				let mut context = InjectionContext::default();
				step(&mut Frame::new(scope, &mut context))
			}))
		};

		tracing::trace!(ty = %ty, ?key, ?mode, nodes, needs_context = shape.needs_context, "compiled producer");
		Self {
			ty,
			key,
			shape,
			generation,
			nodes,
			procedure,
		}
	}

	pub(crate) fn ty(&self) -> &TypeKey {
		&self.ty
	}

	pub(crate) fn key(&self) -> Option<&LocateKey> {
		self.key.as_ref()
	}

	pub(crate) fn shape(&self) -> PlanShape {
		self.shape
	}

	pub(crate) fn generation(&self) -> u64 {
		self.generation
	}

	pub(crate) fn is_scoped(&self) -> bool {
		matches!(self.procedure, Procedure::Scoped(_))
	}

	/// Produces a value for `scope`; a context-shaped producer without a caller context
	/// runs against an empty one.
	pub(crate) fn invoke(&self, scope: &Scope, context: Option<&mut InjectionContext>) -> Result<Option<Instance>> {
		match (&self.procedure, context) {
			(Procedure::Scoped(run), _) => run(scope),
			(Procedure::Contextual(run), Some(context)) => context.with_fresh_graph(|context| run(scope, context)),
			(Procedure::Contextual(run), None) => run(scope, &mut InjectionContext::default()),
		}
	}
}

impl fmt::Debug for CompiledProducer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompiledProducer")
			.field("ty", &self.ty)
			.field("key", &self.key)
			.field("shape", &self.shape)
			.field("generation", &self.generation)
			.field("nodes", &self.nodes)
			.finish_non_exhaustive()
	}
}

/// Runs a plan once without caching, for filtered requests.
pub(crate) fn run_once(plan: &PlanNode, scope: &Scope, context: Option<&mut InjectionContext>) -> Result<Option<Instance>> {
	let mut fresh = InjectionContext::default();
	let context = context.unwrap_or(&mut fresh);
	context.with_fresh_graph(|context| interpret::execute(plan, &mut Frame::new(scope, context)))
}

#[cfg(test)]
mod tests;
