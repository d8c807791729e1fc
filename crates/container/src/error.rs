//! Error types for registration, resolution and disposal.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::activation::StaticInjectionContext;
use crate::lifetime::ScopeId;
use crate::types::{BoxError, LocateKey, TypeKey};

/// Shared handle to a user failure so errors stay cheap to clone.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors raised while resolving a request.
///
/// Any failure aborts the whole top-level resolution; no partial graphs are returned.
#[derive(Debug, Clone, Error)]
pub enum LocateError {
	/// No strategy, wrapper, extra data or default satisfies a required request.
	#[error("{0}")]
	NotLocated(Arc<StaticInjectionContext>),

	/// A keyed export published during resolution collided with an existing key.
	#[error("keyed export {key} for {ty} already exists")]
	KeyConflict {
		/// Exported type.
		ty: TypeKey,
		/// Conflicting key.
		key: LocateKey,
	},

	/// A request appears in its own ancestor chain.
	#[error("dependency cycle: {}", DisplayChain(chain))]
	DependencyCycle {
		/// Requested types from the top-level request down to the repeated one.
		chain: Vec<TypeKey>,
	},

	/// A filter eliminated every candidate of a required single-value request.
	#[error("no strategy for {ty} passed the filter ({candidates} candidate(s) rejected)")]
	AmbiguousPrimary {
		/// Requested type.
		ty: TypeKey,
		/// Number of registered candidates that were rejected.
		candidates: usize,
	},

	/// Resolution was attempted through a scope that has ended.
	#[error("scope {scope} has been disposed")]
	ScopeDisposed {
		/// The ended scope.
		scope: ScopeId,
	},

	/// A user constructor, factory, member injector or decorator failed.
	#[error("activating {ty} failed: {source}")]
	Activation {
		/// Type being activated.
		ty: TypeKey,
		/// The user failure.
		source: SharedError,
	},

	/// A produced value is not of the Rust type the caller asked for.
	#[error("instance located for {found} is not a {expected}")]
	Downcast {
		/// Requested Rust type name.
		expected: &'static str,
		/// Type the instance was located for.
		found: TypeKey,
	},
}

impl LocateError {
	pub(crate) fn activation(ty: &TypeKey, source: BoxError) -> Self {
		Self::Activation {
			ty: ty.clone(),
			source: Arc::from(source),
		}
	}

	/// Returns true if the request itself (not one of its dependencies) was not located.
	pub fn is_root_not_located(&self) -> bool {
		matches!(self, Self::NotLocated(ctx) if ctx.stack().len() <= 1)
	}
}

impl From<RegistryError> for LocateError {
	fn from(err: RegistryError) -> Self {
		match err {
			RegistryError::KeyConflict { ty, key, .. } => Self::KeyConflict { ty, key },
			other => Self::Activation {
				ty: other.ty().clone(),
				source: Arc::new(other),
			},
		}
	}
}

/// Errors raised while publishing strategies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// A keyed export duplicated an existing key under [`crate::DuplicatePolicy::Reject`].
	#[error("keyed export {key} for {ty} is already provided by {existing}")]
	KeyConflict {
		/// Exported type.
		ty: TypeKey,
		/// Conflicting key.
		key: LocateKey,
		/// Activation type of the strategy already holding the key.
		existing: TypeKey,
	},

	/// Decorators cannot target structural shapes or be built from instances or factories.
	#[error("{activation} cannot decorate {ty}")]
	UnsupportedDecorator {
		/// Decorated type.
		ty: TypeKey,
		/// Activation type of the rejected decorator.
		activation: TypeKey,
	},

	/// An open generic strategy exported something other than a generic definition.
	#[error("open generic {activation} must export a generic definition, not {ty}")]
	NotADefinition {
		/// Offending export.
		ty: TypeKey,
		/// Activation type of the strategy.
		activation: TypeKey,
	},
}

impl RegistryError {
	/// The exported type the failure concerns.
	pub fn ty(&self) -> &TypeKey {
		match self {
			Self::KeyConflict { ty, .. } | Self::UnsupportedDecorator { ty, .. } | Self::NotADefinition { ty, .. } => ty,
		}
	}
}

/// One disposer that failed while a scope or owned handle was disposed.
#[derive(Debug, Clone)]
pub struct DisposalFailure {
	/// Type the instance was produced for.
	pub ty: TypeKey,
	/// The disposer's failure.
	pub source: SharedError,
}

/// Failures collected after every tracked instance had a chance to dispose.
#[derive(Debug, Clone, Error)]
#[error("{} instance(s) failed to dispose: {}", failures.len(), DisplayFailures(failures))]
pub struct DisposalError {
	/// Failures in disposal order.
	pub failures: Vec<DisposalFailure>,
}

/// Result type for resolution.
pub type Result<T> = std::result::Result<T, LocateError>;

struct DisplayChain<'a>(&'a [TypeKey]);

impl fmt::Display for DisplayChain<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, ty) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(" -> ")?;
			}
			write!(f, "{ty}")?;
		}
		Ok(())
	}
}

struct DisplayFailures<'a>(&'a [DisposalFailure]);

impl fmt::Display for DisplayFailures<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, failure) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str("; ")?;
			}
			write!(f, "{}: {}", failure.ty, failure.source)?;
		}
		Ok(())
	}
}
