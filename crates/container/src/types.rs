//! Symbolic type identities and the erased instance representation.
//!
//! Requests, exports and lifestyle caches are all keyed by [`TypeKey`]. Structural shapes
//! (arrays, sequences, lazy and owned handles) are first-class variants so the plan builder
//! can recognize them without registration.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{LocateError, Result};

/// Every produced value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Boxed failure raised by user constructors, factories, injectors and disposers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Wraps `value` as an [`Instance`].
#[inline]
pub fn instance<T: Any + Send + Sync>(value: T) -> Instance {
	Arc::new(value)
}

/// Downcasts `instance`, reporting `located` as the type the value was produced for.
pub fn downcast_instance<T: Any + Send + Sync>(instance: &Instance, located: &TypeKey) -> Result<Arc<T>> {
	Arc::clone(instance).downcast::<T>().map_err(|_| LocateError::Downcast {
		expected: std::any::type_name::<T>(),
		found: located.clone(),
	})
}

/// Identity of a requested or exported type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKey {
	/// A plain, non-generic type.
	Named(Arc<str>),
	/// A generic type closed over concrete arguments.
	Generic { definition: Arc<str>, arguments: Arc<[TypeKey]> },
	/// An open generic type definition.
	Definition(Arc<str>),
	/// Array of every strategy exporting the element type.
	Array(Arc<TypeKey>),
	/// Lazily evaluated, restartable sequence of every matching strategy.
	Sequence(Arc<TypeKey>),
	/// Read-only view over every matching strategy.
	ReadOnly(Arc<TypeKey>),
	/// Deferred single value.
	Lazy(Arc<TypeKey>),
	/// Value whose disposal is bound to the handle instead of the ambient scope.
	Owned(Arc<TypeKey>),
	/// The scope the resolution runs in.
	Scope,
	/// The live per-call injection context.
	Context,
	/// The static injection context captured while planning.
	StaticContext,
}

impl TypeKey {
	/// Key for the Rust type `T`, named by [`std::any::type_name`].
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::Named(Arc::from(std::any::type_name::<T>()))
	}

	pub fn named(name: impl Into<Arc<str>>) -> Self {
		Self::Named(name.into())
	}

	pub fn generic(definition: impl Into<Arc<str>>, arguments: impl IntoIterator<Item = TypeKey>) -> Self {
		Self::Generic {
			definition: definition.into(),
			arguments: arguments.into_iter().collect(),
		}
	}

	pub fn definition(name: impl Into<Arc<str>>) -> Self {
		Self::Definition(name.into())
	}

	pub fn array(element: TypeKey) -> Self {
		Self::Array(Arc::new(element))
	}

	pub fn sequence(element: TypeKey) -> Self {
		Self::Sequence(Arc::new(element))
	}

	pub fn read_only(element: TypeKey) -> Self {
		Self::ReadOnly(Arc::new(element))
	}

	pub fn lazy(inner: TypeKey) -> Self {
		Self::Lazy(Arc::new(inner))
	}

	pub fn owned(inner: TypeKey) -> Self {
		Self::Owned(Arc::new(inner))
	}

	/// Returns the open definition a closed generic type was built from.
	pub fn generic_definition(&self) -> Option<TypeKey> {
		match self {
			Self::Generic { definition, .. } => Some(Self::Definition(Arc::clone(definition))),
			_ => None,
		}
	}

	/// Type arguments of a closed generic (empty otherwise).
	pub fn generic_arguments(&self) -> &[TypeKey] {
		match self {
			Self::Generic { arguments, .. } => arguments,
			_ => &[],
		}
	}

	/// Inner type of a structural wrapper shape.
	pub fn element(&self) -> Option<&TypeKey> {
		match self {
			Self::Array(t) | Self::Sequence(t) | Self::ReadOnly(t) | Self::Lazy(t) | Self::Owned(t) => Some(t),
			_ => None,
		}
	}

	/// Returns true for array, sequence and read-only shapes.
	pub fn is_collection_shape(&self) -> bool {
		matches!(self, Self::Array(_) | Self::Sequence(_) | Self::ReadOnly(_))
	}

	/// Returns true for every shape resolved without registration.
	pub fn is_structural(&self) -> bool {
		self.element().is_some() || self.is_known_value()
	}

	/// Returns true for values the engine always supplies itself.
	pub fn is_known_value(&self) -> bool {
		matches!(self, Self::Scope | Self::Context | Self::StaticContext)
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Named(name) => f.write_str(name),
			Self::Generic { definition, arguments } => {
				write!(f, "{definition}<")?;
				for (i, arg) in arguments.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{arg}")?;
				}
				f.write_str(">")
			}
			Self::Definition(name) => write!(f, "{name}<>"),
			Self::Array(t) => write!(f, "[{t}]"),
			Self::Sequence(t) => write!(f, "Sequence<{t}>"),
			Self::ReadOnly(t) => write!(f, "ReadOnly<{t}>"),
			Self::Lazy(t) => write!(f, "Lazy<{t}>"),
			Self::Owned(t) => write!(f, "Owned<{t}>"),
			Self::Scope => f.write_str("Scope"),
			Self::Context => f.write_str("InjectionContext"),
			Self::StaticContext => f.write_str("StaticInjectionContext"),
		}
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeKey({self})")
	}
}

/// Key attached to keyed exports and keyed requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocateKey {
	Str(Arc<str>),
	Int(i64),
}

impl fmt::Display for LocateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Str(s) => write!(f, "{s:?}"),
			Self::Int(i) => write!(f, "{i}"),
		}
	}
}

impl From<&str> for LocateKey {
	fn from(value: &str) -> Self {
		Self::Str(Arc::from(value))
	}
}

impl From<String> for LocateKey {
	fn from(value: String) -> Self {
		Self::Str(Arc::from(value))
	}
}

impl From<Arc<str>> for LocateKey {
	fn from(value: Arc<str>) -> Self {
		Self::Str(value)
	}
}

impl From<i64> for LocateKey {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<i32> for LocateKey {
	fn from(value: i32) -> Self {
		Self::Int(i64::from(value))
	}
}
