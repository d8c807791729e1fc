//! Registered producers.
//!
//! # Role
//!
//! A [`Strategy`] is the immutable, published form of an [`ExportConfig`]. The registry
//! stores and orders strategies; the plan builder turns the chosen one into a plan.
//!
//! # Invariants
//!
//! - A strategy's export set never changes after publication.
//!   - Enforced in: [`Strategy::from_config`] (fields are private, no mutators exist)
//! - Identities are process-unique. Ordinals are assigned when a strategy is published and
//!   follow publication order; closed generics inherit the ordinal of their open definition.
//!   - Enforced in: `StrategyRegistry::publish`
//!   - Tested by: `registry::tests::test_ordinal_follows_publication_not_queueing`,
//!     `registry::tests::test_open_generic_closing_is_memoized`

mod export;
mod filter;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use self::export::ExportConfig;
pub use self::filter::StrategyFilter;
use crate::activation::{InjectionContext, StaticInjectionContext};
use crate::descriptor::{GenericDescriptor, MemberDescriptor, TypeDescriptor};
use crate::lifetime::Scope;
use crate::types::{BoxError, Instance, LocateKey, TypeKey};

static NEXT_STRATEGY: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
	NEXT_STRATEGY.fetch_add(1, Ordering::Relaxed)
}

/// Process-unique strategy identity; also keys lifestyle caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyId(u64);

impl StrategyId {
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for StrategyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "strategy#{}", self.0)
	}
}

/// Reuse policy of produced instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifestyle {
	/// New instance on every resolution.
	#[default]
	Transient,
	/// One instance cached at the root scope.
	Singleton,
	/// One instance per lifetime scope.
	SingletonPerScope,
	/// One instance per top-level resolution call.
	SingletonPerObjectGraph,
}

/// Metadata value attached to a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataValue {
	Str(Arc<str>),
	Int(i64),
	Bool(bool),
	Type(TypeKey),
}

impl From<&str> for MetadataValue {
	fn from(value: &str) -> Self {
		Self::Str(Arc::from(value))
	}
}

impl From<String> for MetadataValue {
	fn from(value: String) -> Self {
		Self::Str(Arc::from(value))
	}
}

impl From<i64> for MetadataValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<bool> for MetadataValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<TypeKey> for MetadataValue {
	fn from(value: TypeKey) -> Self {
		Self::Type(value)
	}
}

/// Cleanup capability of a produced type.
pub trait Dispose: Send + Sync {
	fn dispose(&self) -> Result<(), BoxError>;
}

/// Disposes one erased instance.
pub type Disposer = Arc<dyn Fn(&Instance) -> Result<(), BoxError> + Send + Sync>;

/// Produces an instance from the resolution scope and contexts.
pub type FactoryFn =
	Arc<dyn Fn(&Scope, &StaticInjectionContext, &mut InjectionContext) -> Result<Instance, BoxError> + Send + Sync>;

/// Wraps an already produced instance.
pub type DecorateFn = Arc<dyn Fn(Instance) -> Result<Instance, BoxError> + Send + Sync>;

/// Condition evaluated against the static injection context while planning.
pub type Condition = Arc<dyn Fn(&StaticInjectionContext) -> bool + Send + Sync>;

/// Selects which non-mandatory members a type strategy injects.
#[derive(Clone, Default)]
pub enum MemberSelector {
	/// Only members marked `always`.
	#[default]
	None,
	/// Every described member.
	All,
	/// Members accepted by the predicate, plus members marked `always`.
	Matching(Arc<dyn Fn(&MemberDescriptor) -> bool + Send + Sync>),
}

impl MemberSelector {
	pub fn selects(&self, member: &MemberDescriptor) -> bool {
		member.always
			|| match self {
				Self::None => false,
				Self::All => true,
				Self::Matching(f) => f(member),
			}
	}
}

/// Constructor value override, matched by parameter name or by type.
#[derive(Clone)]
pub struct CtorValue {
	pub name: Option<Arc<str>>,
	pub ty: Option<TypeKey>,
	pub value: Instance,
}

/// How a decorator is placed relative to lifestyle caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoratorRole {
	/// Wraps the already cached instance instead of being cached with it.
	pub apply_after_lifestyle: bool,
}

/// How a strategy produces values.
#[derive(Clone)]
pub enum StrategyKind {
	/// Construct from a descriptor.
	Type(Arc<TypeDescriptor>),
	/// Return a fixed value.
	Instance(Instance),
	/// Call a user factory.
	Factory(FactoryFn),
	/// Open generic definition closed on demand.
	OpenGeneric(Arc<dyn GenericDescriptor>),
	/// Decorator implemented as a function.
	DecorateFn(DecorateFn),
}

impl StrategyKind {
	fn label(&self) -> &'static str {
		match self {
			Self::Type(_) => "type",
			Self::Instance(_) => "instance",
			Self::Factory(_) => "factory",
			Self::OpenGeneric(_) => "open_generic",
			Self::DecorateFn(_) => "decorate_fn",
		}
	}
}

/// A published producer.
#[derive(Clone)]
pub struct Strategy {
	id: StrategyId,
	ordinal: u64,
	activation: TypeKey,
	exports: Vec<TypeKey>,
	keyed: Vec<(TypeKey, LocateKey)>,
	names: Vec<Arc<str>>,
	priority: i32,
	lifestyle: Lifestyle,
	conditions: Vec<Condition>,
	metadata: FxHashMap<Arc<str>, MetadataValue>,
	externally_owned: bool,
	members: MemberSelector,
	ctor_values: Vec<CtorValue>,
	disposer: Option<Disposer>,
	decorator: Option<DecoratorRole>,
	kind: StrategyKind,
}

impl Strategy {
	/// Builds the registered form of `config`, assigning a fresh identity.
	///
	/// The ordinal stays 0 until the registry publishes the strategy.
	pub fn from_config(config: ExportConfig) -> Self {
		let mut exports = config.exports;
		if exports.is_empty() && config.keyed.is_empty() {
			exports.push(config.activation.clone());
		}
		Self {
			id: StrategyId(next_id()),
			ordinal: 0,
			activation: config.activation,
			exports,
			keyed: config.keyed,
			names: config.names,
			priority: config.priority,
			lifestyle: config.lifestyle,
			conditions: config.conditions,
			metadata: config.metadata,
			externally_owned: config.externally_owned,
			members: config.members,
			ctor_values: config.ctor_values,
			disposer: config.disposer,
			decorator: config.decorator,
			kind: config.kind,
		}
	}

	/// Copy of this strategy at position `ordinal` of the registration order.
	pub(crate) fn published(&self, ordinal: u64) -> Self {
		Self { ordinal, ..self.clone() }
	}

	/// Closes an open generic strategy for `requested`.
	///
	/// The closed strategy gets a new identity (so lifestyle caches are per closed type) but
	/// keeps the ordinal, priority and configuration of the open one.
	pub(crate) fn close(&self, requested: &TypeKey) -> Option<Self> {
		let StrategyKind::OpenGeneric(generic) = &self.kind else {
			return None;
		};
		let descriptor = generic.close(requested.generic_arguments())?;
		Some(Self {
			id: StrategyId(next_id()),
			activation: descriptor.ty.clone(),
			exports: vec![requested.clone()],
			keyed: Vec::new(),
			kind: StrategyKind::Type(Arc::new(descriptor)),
			..self.clone()
		})
	}

	pub fn id(&self) -> StrategyId {
		self.id
	}

	/// Registration order.
	pub fn ordinal(&self) -> u64 {
		self.ordinal
	}

	pub fn activation_type(&self) -> &TypeKey {
		&self.activation
	}

	pub fn exports(&self) -> &[TypeKey] {
		&self.exports
	}

	pub fn keyed_exports(&self) -> &[(TypeKey, LocateKey)] {
		&self.keyed
	}

	pub fn names(&self) -> &[Arc<str>] {
		&self.names
	}

	pub fn priority(&self) -> i32 {
		self.priority
	}

	pub fn lifestyle(&self) -> Lifestyle {
		self.lifestyle
	}

	pub fn metadata(&self, key: &str) -> Option<&MetadataValue> {
		self.metadata.get(key)
	}

	pub fn metadata_entries(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
		self.metadata.iter().map(|(k, v)| (&**k, v))
	}

	pub fn is_externally_owned(&self) -> bool {
		self.externally_owned
	}

	pub fn member_selector(&self) -> &MemberSelector {
		&self.members
	}

	pub fn ctor_values(&self) -> &[CtorValue] {
		&self.ctor_values
	}

	pub fn disposer(&self) -> Option<&Disposer> {
		self.disposer.as_ref()
	}

	pub fn decorator_role(&self) -> Option<DecoratorRole> {
		self.decorator
	}

	pub fn is_decorator(&self) -> bool {
		self.decorator.is_some()
	}

	pub fn kind(&self) -> &StrategyKind {
		&self.kind
	}

	pub fn has_conditions(&self) -> bool {
		!self.conditions.is_empty()
	}

	/// Returns true if every condition accepts `context`.
	pub fn meets_conditions(&self, context: &StaticInjectionContext) -> bool {
		self.conditions.iter().all(|condition| condition(context))
	}

	/// Constructor override for a parameter, by name first and then by type.
	pub fn ctor_value_for(&self, name: &str, ty: &TypeKey) -> Option<&Instance> {
		self.ctor_values
			.iter()
			.find(|v| v.name.as_deref() == Some(name))
			.or_else(|| self.ctor_values.iter().find(|v| v.name.is_none() && v.ty.as_ref() == Some(ty)))
			.map(|v| &v.value)
	}
}

impl fmt::Debug for Strategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Strategy")
			.field("id", &self.id)
			.field("kind", &self.kind.label())
			.field("activation", &self.activation)
			.field("exports", &self.exports)
			.field("keyed", &self.keyed)
			.field("priority", &self.priority)
			.field("lifestyle", &self.lifestyle)
			.field("decorator", &self.decorator)
			.finish_non_exhaustive()
	}
}

impl fmt::Display for Strategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.activation, self.id)
	}
}
