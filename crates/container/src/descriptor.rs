//! Construction capability supplied by the host for each activatable type.
//!
//! The engine never inspects Rust types. A [`TypeDescriptor`] lists candidate constructors
//! (each an ordered [`Dependency`] list plus a construct closure) and injectable members. It
//! can be written by hand, generated, or produced by a discovery collaborator.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{LocateError, Result};
use crate::handles::InstanceList;
use crate::types::{BoxError, Instance, LocateKey, TypeKey, downcast_instance};

/// Builds an instance from resolved constructor arguments.
pub type ConstructFn = Arc<dyn Fn(&Arguments) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// Assigns a resolved value to a member of an already constructed instance.
pub type InjectFn = Arc<dyn Fn(&Instance, Instance) -> std::result::Result<(), BoxError> + Send + Sync>;

/// A value a constructor parameter or member needs.
#[derive(Clone)]
pub struct Dependency {
	pub name: Arc<str>,
	pub ty: TypeKey,
	pub key: Option<LocateKey>,
	/// Required dependencies fail the activation when they cannot be located.
	pub required: bool,
	/// Used when an optional dependency cannot be located.
	pub default: Option<Instance>,
}

impl Dependency {
	/// Required dependency on `ty`.
	pub fn new(name: impl Into<Arc<str>>, ty: TypeKey) -> Self {
		Self {
			name: name.into(),
			ty,
			key: None,
			required: true,
			default: None,
		}
	}

	/// Required dependency on the Rust type `T`.
	pub fn of<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
		Self::new(name, TypeKey::of::<T>())
	}

	pub fn keyed(mut self, key: impl Into<LocateKey>) -> Self {
		self.key = Some(key.into());
		self
	}

	pub fn optional(mut self) -> Self {
		self.required = false;
		self
	}

	/// Makes the dependency optional, falling back to `value`.
	pub fn with_default<T: Any + Send + Sync>(mut self, value: T) -> Self {
		self.required = false;
		self.default = Some(Arc::new(value));
		self
	}
}

impl fmt::Debug for Dependency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dependency")
			.field("name", &self.name)
			.field("ty", &self.ty)
			.field("key", &self.key)
			.field("required", &self.required)
			.field("has_default", &self.default.is_some())
			.finish()
	}
}

/// Positional constructor arguments; absent entries are optional dependencies that were not located.
pub struct Arguments {
	params: Arc<[Dependency]>,
	values: Vec<Option<Instance>>,
}

impl Arguments {
	pub(crate) fn new(params: Arc<[Dependency]>, values: Vec<Option<Instance>>) -> Self {
		Self { params, values }
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Raw value at `index`, if one was located.
	pub fn instance(&self, index: usize) -> Option<&Instance> {
		self.values.get(index).and_then(Option::as_ref)
	}

	/// Typed value at `index`; absent values are reported as a downcast failure.
	pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
		match self.instance(index) {
			Some(value) => downcast_instance(value, &self.located(index)),
			None => Err(LocateError::Downcast {
				expected: std::any::type_name::<T>(),
				found: self.located(index),
			}),
		}
	}

	/// Typed value at `index`, or `None` for an optional dependency that was not located.
	pub fn optional<T: Any + Send + Sync>(&self, index: usize) -> Result<Option<Arc<T>>> {
		self.instance(index).map(|value| downcast_instance(value, &self.located(index))).transpose()
	}

	/// Array-shaped value at `index`.
	pub fn list(&self, index: usize) -> Result<Arc<InstanceList>> {
		self.get::<InstanceList>(index)
	}

	fn located(&self, index: usize) -> TypeKey {
		self.params.get(index).map_or_else(|| TypeKey::named("<no parameter>"), |p| p.ty.clone())
	}
}

/// One candidate constructor.
#[derive(Clone)]
pub struct ConstructorDescriptor {
	pub params: Arc<[Dependency]>,
	pub construct: ConstructFn,
}

impl ConstructorDescriptor {
	pub fn new<F>(params: impl IntoIterator<Item = Dependency>, construct: F) -> Self
	where
		F: Fn(&Arguments) -> std::result::Result<Instance, BoxError> + Send + Sync + 'static,
	{
		Self {
			params: params.into_iter().collect(),
			construct: Arc::new(construct),
		}
	}
}

impl fmt::Debug for ConstructorDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConstructorDescriptor").field("params", &self.params).finish_non_exhaustive()
	}
}

/// An injectable member.
#[derive(Clone)]
pub struct MemberDescriptor {
	pub name: Arc<str>,
	pub dependency: Dependency,
	pub inject: InjectFn,
	/// Injected even when the strategy does not select members.
	pub always: bool,
}

impl fmt::Debug for MemberDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemberDescriptor")
			.field("name", &self.name)
			.field("dependency", &self.dependency)
			.field("always", &self.always)
			.finish_non_exhaustive()
	}
}

/// How to build one concrete type.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
	pub ty: TypeKey,
	pub constructors: Vec<ConstructorDescriptor>,
	pub members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
	pub fn new(ty: TypeKey) -> Self {
		Self {
			ty,
			constructors: Vec::new(),
			members: Vec::new(),
		}
	}

	/// Descriptor for the Rust type `T`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::new(TypeKey::of::<T>())
	}

	/// Adds a candidate constructor.
	pub fn constructor<F>(mut self, params: impl IntoIterator<Item = Dependency>, construct: F) -> Self
	where
		F: Fn(&Arguments) -> std::result::Result<Instance, BoxError> + Send + Sync + 'static,
	{
		self.constructors.push(ConstructorDescriptor::new(params, construct));
		self
	}

	/// Adds a member that is injected only when the strategy selects it.
	pub fn member<F>(self, dependency: Dependency, inject: F) -> Self
	where
		F: Fn(&Instance, Instance) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
	{
		self.push_member(dependency, inject, false)
	}

	/// Adds a member that is always injected.
	pub fn import_member<F>(self, dependency: Dependency, inject: F) -> Self
	where
		F: Fn(&Instance, Instance) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
	{
		self.push_member(dependency, inject, true)
	}

	fn push_member<F>(mut self, dependency: Dependency, inject: F, always: bool) -> Self
	where
		F: Fn(&Instance, Instance) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
	{
		self.members.push(MemberDescriptor {
			name: Arc::clone(&dependency.name),
			dependency,
			inject: Arc::new(inject),
			always,
		});
		self
	}

	/// Constructors ordered from most to fewest parameters, declaration order on ties.
	pub fn constructors_by_arity(&self) -> Vec<&ConstructorDescriptor> {
		let mut ctors: Vec<_> = self.constructors.iter().collect();
		ctors.sort_by(|a, b| b.params.len().cmp(&a.params.len()));
		ctors
	}
}

/// Closes an open generic definition over concrete type arguments.
pub trait GenericDescriptor: Send + Sync {
	/// Returns the descriptor of the closed type, or `None` if the arguments do not fit.
	fn close(&self, arguments: &[TypeKey]) -> Option<TypeDescriptor>;
}

impl<F> GenericDescriptor for F
where
	F: Fn(&[TypeKey]) -> Option<TypeDescriptor> + Send + Sync,
{
	fn close(&self, arguments: &[TypeKey]) -> Option<TypeDescriptor> {
		self(arguments)
	}
}
