//! Hooks into registry publication, producer compilation and scope disposal.

use crate::activation::PlanShape;
use crate::lifetime::ScopeId;
use crate::strategy::Strategy;
use crate::types::{LocateKey, TypeKey};

/// Receives container events. Every method defaults to doing nothing.
///
/// Callbacks run on the thread that caused the event, possibly while a scope's activation
/// lock is held; they must not resolve through the container.
pub trait ActivationObserver: Send + Sync {
	/// A strategy was published.
	fn strategy_added(&self, _strategy: &Strategy) {}

	/// A producer was compiled and cached for a top-level request.
	fn producer_compiled(&self, _ty: &TypeKey, _key: Option<&LocateKey>, _shape: PlanShape) {}

	/// A scope ended after disposing `disposed` instances, `failures` of which failed.
	fn scope_ended(&self, _scope: ScopeId, _name: Option<&str>, _disposed: usize, _failures: usize) {}
}

/// Default observer: reports every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ActivationObserver for TracingObserver {
	fn strategy_added(&self, strategy: &Strategy) {
		tracing::trace!(strategy = %strategy, exports = strategy.exports().len(), priority = strategy.priority(), "strategy added");
	}

	fn producer_compiled(&self, ty: &TypeKey, key: Option<&LocateKey>, shape: PlanShape) {
		tracing::debug!(ty = %ty, ?key, needs_context = shape.needs_context, "producer compiled");
	}

	fn scope_ended(&self, scope: ScopeId, name: Option<&str>, disposed: usize, failures: usize) {
		if failures > 0 {
			tracing::warn!(%scope, ?name, disposed, failures, "scope ended with disposal failures");
		} else {
			tracing::trace!(%scope, ?name, disposed, "scope ended");
		}
	}
}
