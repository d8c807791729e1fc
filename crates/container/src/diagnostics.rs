//! Read-only checks over a registry snapshot.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::Dependency;
use crate::registry::RegistrySnapshot;
use crate::strategy::{Strategy, StrategyKind};
use crate::types::TypeKey;

/// A required dependency that nothing registered can satisfy.
#[derive(Clone)]
pub struct MissingDependency {
	pub strategy: Arc<Strategy>,
	pub dependency: Dependency,
}

impl fmt::Display for MissingDependency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} needs {} for {}",
			self.strategy.activation_type(),
			self.dependency.ty,
			self.dependency.name
		)?;
		if let Some(key) = &self.dependency.key {
			write!(f, " (key {key})")?;
		}
		Ok(())
	}
}

impl fmt::Debug for MissingDependency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "MissingDependency({self})")
	}
}

/// Static analysis over one registry version.
pub struct Diagnostics {
	snap: Arc<RegistrySnapshot>,
}

impl Diagnostics {
	pub fn new(snap: Arc<RegistrySnapshot>) -> Self {
		Self { snap }
	}

	/// Required dependencies of type strategies that no export, shape or wrapper satisfies.
	///
	/// Only the largest constructor of each type is inspected, together with its
	/// always-injected members. Missing-strategy providers are not consulted.
	pub fn possible_missing_dependencies(&self) -> Vec<MissingDependency> {
		let mut missing = Vec::new();

		for strategy in self.snap.all_strategies() {
			let StrategyKind::Type(descriptor) = strategy.kind() else {
				continue;
			};
			let params = descriptor.constructors_by_arity().first().map(|ctor| Arc::clone(&ctor.params));
			let members = descriptor.members.iter().filter(|m| m.always).map(|m| &m.dependency);

			for dependency in params.iter().flat_map(|p| p.iter()).chain(members) {
				if !dependency.required || strategy.ctor_value_for(&dependency.name, &dependency.ty).is_some() {
					continue;
				}
				if !self.is_satisfiable(&dependency.ty, dependency.key.is_some()) {
					missing.push(MissingDependency {
						strategy: Arc::clone(strategy),
						dependency: dependency.clone(),
					});
				}
			}
		}

		missing.sort_by_cached_key(ToString::to_string);
		missing
	}

	/// Keyed requests fall back to extra data at runtime and are never reported.
	fn is_satisfiable(&self, ty: &TypeKey, keyed: bool) -> bool {
		if keyed || ty.is_known_value() || ty.is_collection_shape() || self.snap.has_export(ty) {
			return true;
		}
		match ty {
			TypeKey::Lazy(inner) | TypeKey::Owned(inner) => self.is_satisfiable(inner, false),
			_ => ty.generic_definition().is_some_and(|def| {
				self.snap.has_export(&def)
					|| self
						.snap
						.wrapper(&def)
						.and_then(|w| w.inner_type(ty))
						.is_some_and(|inner| self.is_satisfiable(&inner, false))
			}),
		}
	}
}
