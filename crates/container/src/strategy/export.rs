use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{
	Condition, CtorValue, DecorateFn, DecoratorRole, Dispose, Disposer, FactoryFn, Lifestyle, MemberSelector, MetadataValue,
	StrategyKind,
};
use crate::activation::{InjectionContext, StaticInjectionContext};
use crate::descriptor::{GenericDescriptor, MemberDescriptor, TypeDescriptor};
use crate::lifetime::Scope;
use crate::types::{BoxError, Instance, LocateKey, TypeKey};

/// Plain configuration value consumed once by the registry.
///
/// ```ignore
/// let config = ExportConfig::of_type(descriptor)
/// 	.as_type(TypeKey::named("Logger"))
/// 	.with_priority(5)
/// 	.singleton();
/// ```
#[derive(Clone)]
pub struct ExportConfig {
	pub(super) activation: TypeKey,
	pub(super) kind: StrategyKind,
	pub(super) exports: Vec<TypeKey>,
	pub(super) keyed: Vec<(TypeKey, LocateKey)>,
	pub(super) names: Vec<Arc<str>>,
	pub(super) priority: i32,
	pub(super) lifestyle: Lifestyle,
	pub(super) conditions: Vec<Condition>,
	pub(super) metadata: FxHashMap<Arc<str>, MetadataValue>,
	pub(super) externally_owned: bool,
	pub(super) members: MemberSelector,
	pub(super) ctor_values: Vec<CtorValue>,
	pub(super) disposer: Option<Disposer>,
	pub(super) decorator: Option<DecoratorRole>,
}

impl ExportConfig {
	fn with_kind(activation: TypeKey, kind: StrategyKind) -> Self {
		Self {
			activation,
			kind,
			exports: Vec::new(),
			keyed: Vec::new(),
			names: Vec::new(),
			priority: 0,
			lifestyle: Lifestyle::Transient,
			conditions: Vec::new(),
			metadata: FxHashMap::default(),
			externally_owned: false,
			members: MemberSelector::None,
			ctor_values: Vec::new(),
			disposer: None,
			decorator: None,
		}
	}

	/// Exports a type built from its descriptor.
	pub fn of_type(descriptor: TypeDescriptor) -> Self {
		let activation = descriptor.ty.clone();
		Self::with_kind(activation, StrategyKind::Type(Arc::new(descriptor)))
	}

	/// Exports a fixed value. Instances are owned by the caller and never tracked for disposal.
	pub fn instance<T: Any + Send + Sync>(ty: TypeKey, value: T) -> Self {
		let mut config = Self::with_kind(ty, StrategyKind::Instance(Arc::new(value)));
		config.externally_owned = true;
		config
	}

	/// Exports an already erased value.
	pub fn instance_erased(ty: TypeKey, value: Instance) -> Self {
		let mut config = Self::with_kind(ty, StrategyKind::Instance(value));
		config.externally_owned = true;
		config
	}

	/// Exports the result of a factory.
	pub fn factory<F>(ty: TypeKey, factory: F) -> Self
	where
		F: Fn(&Scope, &StaticInjectionContext, &mut InjectionContext) -> Result<Instance, BoxError> + Send + Sync + 'static,
	{
		let factory: FactoryFn = Arc::new(factory);
		Self::with_kind(ty, StrategyKind::Factory(factory))
	}

	/// Exports an open generic definition closed on demand.
	pub fn open_generic(definition: TypeKey, descriptor: impl GenericDescriptor + 'static) -> Self {
		Self::with_kind(definition, StrategyKind::OpenGeneric(Arc::new(descriptor)))
	}

	/// Decorates every instance of `ty` with a function.
	pub fn decorator_fn<F>(ty: TypeKey, decorate: F) -> Self
	where
		F: Fn(Instance) -> Result<Instance, BoxError> + Send + Sync + 'static,
	{
		let decorate: DecorateFn = Arc::new(decorate);
		let mut config = Self::with_kind(ty.clone(), StrategyKind::DecorateFn(decorate));
		config.exports.push(ty);
		config.decorator = Some(DecoratorRole {
			apply_after_lifestyle: false,
		});
		config
	}

	pub fn as_type(mut self, ty: TypeKey) -> Self {
		self.exports.push(ty);
		self
	}

	pub fn as_keyed(mut self, ty: TypeKey, key: impl Into<LocateKey>) -> Self {
		self.keyed.push((ty, key.into()));
		self
	}

	pub fn as_name(mut self, name: impl Into<Arc<str>>) -> Self {
		self.names.push(name.into());
		self
	}

	pub fn with_priority(mut self, priority: i32) -> Self {
		self.priority = priority;
		self
	}

	pub fn lifestyle(mut self, lifestyle: Lifestyle) -> Self {
		self.lifestyle = lifestyle;
		self
	}

	pub fn singleton(self) -> Self {
		self.lifestyle(Lifestyle::Singleton)
	}

	pub fn singleton_per_scope(self) -> Self {
		self.lifestyle(Lifestyle::SingletonPerScope)
	}

	pub fn singleton_per_object_graph(self) -> Self {
		self.lifestyle(Lifestyle::SingletonPerObjectGraph)
	}

	/// Adds a condition; all conditions must hold for the strategy to be used.
	pub fn when<F>(mut self, condition: F) -> Self
	where
		F: Fn(&StaticInjectionContext) -> bool + Send + Sync + 'static,
	{
		self.conditions.push(Arc::new(condition));
		self
	}

	/// Adds a negated condition.
	pub fn unless<F>(self, condition: F) -> Self
	where
		F: Fn(&StaticInjectionContext) -> bool + Send + Sync + 'static,
	{
		self.when(move |ctx| !condition(ctx))
	}

	/// Only used when the requesting type is `ty`.
	pub fn when_injected_into(self, ty: TypeKey) -> Self {
		self.when(move |ctx| ctx.requesting_type() == Some(&ty))
	}

	pub fn with_metadata(mut self, key: impl Into<Arc<str>>, value: impl Into<MetadataValue>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	/// Produced instances are never tracked for disposal.
	pub fn externally_owned(mut self) -> Self {
		self.externally_owned = true;
		self
	}

	/// Injects every described member.
	pub fn import_members(mut self) -> Self {
		self.members = MemberSelector::All;
		self
	}

	/// Injects members accepted by `selector`.
	pub fn import_members_matching<F>(mut self, selector: F) -> Self
	where
		F: Fn(&MemberDescriptor) -> bool + Send + Sync + 'static,
	{
		self.members = MemberSelector::Matching(Arc::new(selector));
		self
	}

	/// Supplies the constructor parameter called `name`.
	pub fn with_ctor_value<T: Any + Send + Sync>(mut self, name: impl Into<Arc<str>>, value: T) -> Self {
		self.ctor_values.push(CtorValue {
			name: Some(name.into()),
			ty: None,
			value: Arc::new(value),
		});
		self
	}

	/// Supplies every constructor parameter of type `ty` not matched by name.
	pub fn with_ctor_value_of<T: Any + Send + Sync>(mut self, ty: TypeKey, value: T) -> Self {
		self.ctor_values.push(CtorValue {
			name: None,
			ty: Some(ty),
			value: Arc::new(value),
		});
		self
	}

	/// Disposes produced values through their [`Dispose`] implementation.
	pub fn disposable<T: Dispose + Any>(self) -> Self {
		let ty = self.activation.clone();
		self.with_disposer(move |instance| match Arc::clone(instance).downcast::<T>() {
			Ok(value) => value.dispose(),
			Err(_) => Err(format!("instance produced for {ty} is not a {}", std::any::type_name::<T>()).into()),
		})
	}

	pub fn with_disposer<F>(mut self, disposer: F) -> Self
	where
		F: Fn(&Instance) -> Result<(), BoxError> + Send + Sync + 'static,
	{
		self.disposer = Some(Arc::new(disposer));
		self
	}

	/// Marks a type strategy as a decorator of its export types.
	pub fn decorator(mut self) -> Self {
		self.decorator.get_or_insert(DecoratorRole {
			apply_after_lifestyle: false,
		});
		self
	}

	/// Marks the decorator to wrap the lifestyle-cached instance.
	pub fn apply_after_lifestyle(mut self) -> Self {
		self.decorator = Some(DecoratorRole {
			apply_after_lifestyle: true,
		});
		self
	}

	pub fn activation_type(&self) -> &TypeKey {
		&self.activation
	}
}
