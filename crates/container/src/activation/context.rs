//! Static and per-call injection contexts.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::Result;
use crate::lifetime::LifestyleKey;
use crate::types::{Instance, LocateKey, TypeKey, downcast_instance};

/// Where a requested value is injected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionTarget {
	/// The top-level request.
	Root,
	/// A constructor parameter of the requesting type.
	ConstructorParameter(Arc<str>),
	/// A member of the requesting type.
	Member(Arc<str>),
	/// An element of a collection or the inner value of a wrapper.
	Element,
}

/// One step of the injection stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionTargetInfo {
	/// Type being located at this step.
	pub locate_type: TypeKey,
	/// Type whose construction asked for it, if any.
	pub requesting_type: Option<TypeKey>,
	pub target: InjectionTarget,
}

/// Request chain captured while planning.
///
/// Handed to factories and conditions, and rendered into "could not locate" failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticInjectionContext {
	activation_type: TypeKey,
	/// Root first.
	stack: Arc<[InjectionTargetInfo]>,
}

impl StaticInjectionContext {
	/// Context of a top-level request for `ty`.
	pub fn root(ty: TypeKey) -> Self {
		let info = InjectionTargetInfo {
			locate_type: ty.clone(),
			requesting_type: None,
			target: InjectionTarget::Root,
		};
		Self {
			activation_type: ty,
			stack: Arc::from([info]),
		}
	}

	/// Context one level deeper.
	pub fn push(&self, info: InjectionTargetInfo) -> Self {
		let mut stack = self.stack.to_vec();
		let activation_type = info.locate_type.clone();
		stack.push(info);
		Self {
			activation_type,
			stack: Arc::from(stack),
		}
	}

	/// Type being located.
	pub fn activation_type(&self) -> &TypeKey {
		&self.activation_type
	}

	/// Injection stack, top-level request first.
	pub fn stack(&self) -> &[InjectionTargetInfo] {
		&self.stack
	}

	/// Innermost step.
	pub fn target_info(&self) -> Option<&InjectionTargetInfo> {
		self.stack.last()
	}

	/// Type whose construction asked for the current value.
	pub fn requesting_type(&self) -> Option<&TypeKey> {
		self.target_info().and_then(|info| info.requesting_type.as_ref())
	}
}

impl fmt::Display for StaticInjectionContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "could not locate type {}", self.activation_type)?;
		for (depth, info) in self.stack.iter().rev().enumerate() {
			let Some(requester) = &info.requesting_type else {
				continue;
			};
			write!(f, "\n{} importing {} ", depth + 1, info.locate_type)?;
			match &info.target {
				InjectionTarget::ConstructorParameter(name) => write!(f, "for constructor parameter {name} of {requester}")?,
				InjectionTarget::Member(name) => write!(f, "for member {name} of {requester}")?,
				InjectionTarget::Element | InjectionTarget::Root => write!(f, "as element of {requester}")?,
			}
		}
		Ok(())
	}
}

/// Per-call carrier of ambient data, threaded through one top-level resolution.
#[derive(Default, Clone)]
pub struct InjectionContext {
	extra: FxHashMap<LocateKey, Instance>,
	graph: FxHashMap<LifestyleKey, Instance>,
	stack: SmallVec<[TypeKey; 8]>,
}

impl InjectionContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder form of [`Self::set_extra_data`].
	pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<LocateKey>, value: T) -> Self {
		self.set_extra_data(key, value);
		self
	}

	pub fn set_extra_data<T: Any + Send + Sync>(&mut self, key: impl Into<LocateKey>, value: T) {
		self.extra.insert(key.into(), Arc::new(value));
	}

	pub fn set_extra_instance(&mut self, key: impl Into<LocateKey>, value: Instance) {
		self.extra.insert(key.into(), value);
	}

	pub fn extra_data(&self, key: &LocateKey) -> Option<&Instance> {
		self.extra.get(key)
	}

	/// Typed extra data.
	pub fn get_extra<T: Any + Send + Sync>(&self, key: impl Into<LocateKey>) -> Result<Option<Arc<T>>> {
		let key = key.into();
		let located = TypeKey::named(format!("extra data {key}"));
		self.extra.get(&key).map(|v| downcast_instance(v, &located)).transpose()
	}

	pub fn remove_extra_data(&mut self, key: &LocateKey) -> Option<Instance> {
		self.extra.remove(key)
	}

	pub fn extra_keys(&self) -> impl Iterator<Item = &LocateKey> {
		self.extra.keys()
	}

	/// Types currently being constructed, outermost first.
	pub fn activation_stack(&self) -> &[TypeKey] {
		&self.stack
	}

	/// Fresh context carrying only this context's extra data.
	pub(crate) fn detached(&self) -> Self {
		Self {
			extra: self.extra.clone(),
			graph: FxHashMap::default(),
			stack: SmallVec::new(),
		}
	}

	/// Runs one top-level resolution against an empty object graph.
	///
	/// The caller's graph is restored afterwards, so a resolution nested inside a factory
	/// does not disturb the one that invoked it.
	pub(crate) fn with_fresh_graph<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
		let outer = std::mem::take(&mut self.graph);
		let result = body(self);
		self.graph = outer;
		result
	}

	pub(crate) fn graph_instance(&self, key: &LifestyleKey) -> Option<Instance> {
		self.graph.get(key).cloned()
	}

	pub(crate) fn store_graph_instance(&mut self, key: LifestyleKey, value: Instance) {
		self.graph.insert(key, value);
	}

	pub(crate) fn enter(&mut self, ty: &TypeKey) {
		self.stack.push(ty.clone());
	}

	pub(crate) fn leave(&mut self) {
		self.stack.pop();
	}
}

impl fmt::Debug for InjectionContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InjectionContext")
			.field("extra", &self.extra.keys().collect::<Vec<_>>())
			.field("graph", &self.graph.len())
			.field("stack", &self.stack.as_slice())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_static_context_renders_import_chain() {
		let root = StaticInjectionContext::root(TypeKey::named("Service"));
		let leaf = root.push(InjectionTargetInfo {
			locate_type: TypeKey::named("Repository"),
			requesting_type: Some(TypeKey::named("Service")),
			target: InjectionTarget::ConstructorParameter(Arc::from("repo")),
		});

		assert_eq!(leaf.activation_type(), &TypeKey::named("Repository"));
		assert_eq!(leaf.requesting_type(), Some(&TypeKey::named("Service")));
		assert_eq!(leaf.stack().len(), 2);
		assert_eq!(
			leaf.to_string(),
			"could not locate type Repository\n1 importing Repository for constructor parameter repo of Service"
		);
	}

	#[test]
	fn test_extra_data_is_typed() {
		let ctx = InjectionContext::new().with("name", String::from("trellis"));
		assert_eq!(ctx.get_extra::<String>("name").unwrap().as_deref().map(String::as_str), Some("trellis"));
		assert!(ctx.get_extra::<u8>("name").is_err());
		assert!(ctx.get_extra::<u8>("missing").unwrap().is_none());
		assert!(ctx.detached().extra_data(&LocateKey::from("name")).is_some());
	}
}
