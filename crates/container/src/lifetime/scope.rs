use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{ScopeId, ScopeNode};
use crate::activation::{ActivationRequest, InjectionContext, PlanBuilder, StaticInjectionContext};
use crate::compiler;
use crate::container::ContainerShared;
use crate::error::{DisposalError, LocateError, Result};
use crate::handles::InstanceList;
use crate::strategy::StrategyFilter;
use crate::types::{Instance, LocateKey, TypeKey, downcast_instance};

#[derive(Clone, Copy)]
struct Query<'q> {
	ty: &'q TypeKey,
	key: Option<&'q LocateKey>,
	filter: Option<&'q StrategyFilter>,
	prioritize: Option<&'q StrategyFilter>,
}

impl<'q> Query<'q> {
	fn of(ty: &'q TypeKey) -> Self {
		Self {
			ty,
			key: None,
			filter: None,
			prioritize: None,
		}
	}

	fn keyed(ty: &'q TypeKey, key: &'q LocateKey) -> Self {
		Self { key: Some(key), ..Self::of(ty) }
	}
}

/// Handle to a lifetime scope.
///
/// Cloning is cheap; every clone refers to the same scope. Values with the per-scope
/// lifestyle and disposables produced through a scope belong to it until [`Scope::end`].
#[derive(Clone)]
pub struct Scope {
	pub(crate) shared: Arc<ContainerShared>,
	pub(crate) node: Arc<ScopeNode>,
}

impl Scope {
	pub(crate) fn new(shared: Arc<ContainerShared>, node: Arc<ScopeNode>) -> Self {
		Self { shared, node }
	}

	pub fn id(&self) -> ScopeId {
		self.node.id
	}

	pub fn name(&self) -> Option<&str> {
		self.node.name.as_deref()
	}

	pub fn parent(&self) -> Option<ScopeId> {
		self.node.parent
	}

	pub fn is_root(&self) -> bool {
		self.node.parent.is_none()
	}

	pub fn is_disposed(&self) -> bool {
		self.node.is_disposed()
	}

	/// The container's root scope.
	pub fn root(&self) -> Scope {
		Self::new(Arc::clone(&self.shared), Arc::clone(&self.shared.root))
	}

	/// Instances this scope will dispose when it ends.
	pub fn tracked_disposables(&self) -> usize {
		self.node.disposal.len()
	}

	/// Values cached in this scope by singleton lifestyles.
	pub fn cached_values(&self) -> usize {
		self.node.singletons.len()
	}

	/// Live child scopes.
	pub fn child_count(&self) -> usize {
		self.node.child_count()
	}

	/// Opens a child scope.
	pub fn begin_lifetime_scope(&self, name: Option<&str>) -> Result<Scope> {
		self.ensure_live()?;
		let node = self.shared.arena.insert(Some(self.node.id), name.map(Arc::from));
		self.node.add_child(node.id);
		tracing::debug!(scope = %node.id, parent = %self.node.id, name = ?node.name, "lifetime scope started");
		Ok(Self::new(Arc::clone(&self.shared), node))
	}

	pub fn locate<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
		let ty = TypeKey::of::<T>();
		downcast_instance(&self.required(Query::of(&ty), None)?, &ty)
	}

	pub fn locate_instance(&self, ty: &TypeKey) -> Result<Instance> {
		self.required(Query::of(ty), None)
	}

	pub fn locate_keyed<T: Any + Send + Sync>(&self, key: impl Into<LocateKey>) -> Result<Arc<T>> {
		let ty = TypeKey::of::<T>();
		let key = key.into();
		downcast_instance(&self.required(Query::keyed(&ty, &key), None)?, &ty)
	}

	pub fn locate_keyed_instance(&self, ty: &TypeKey, key: &LocateKey) -> Result<Instance> {
		self.required(Query::keyed(ty, key), None)
	}

	/// Like [`Self::locate`], but `None` when the type itself cannot be located.
	///
	/// Failures further down the graph are still reported.
	pub fn try_locate<T: Any + Send + Sync>(&self) -> Result<Option<Arc<T>>> {
		let ty = TypeKey::of::<T>();
		self.optional(Query::of(&ty), None)?.map(|value| downcast_instance(&value, &ty)).transpose()
	}

	pub fn try_locate_instance(&self, ty: &TypeKey) -> Result<Option<Instance>> {
		self.optional(Query::of(ty), None)
	}

	pub fn try_locate_keyed_instance(&self, ty: &TypeKey, key: &LocateKey) -> Result<Option<Instance>> {
		self.optional(Query::keyed(ty, key), None)
	}

	/// Locates with caller-supplied extra data.
	pub fn locate_with_context<T: Any + Send + Sync>(&self, context: &mut InjectionContext) -> Result<Arc<T>> {
		let ty = TypeKey::of::<T>();
		downcast_instance(&self.required(Query::of(&ty), Some(context))?, &ty)
	}

	pub fn locate_instance_with_context(&self, ty: &TypeKey, key: Option<&LocateKey>, context: &mut InjectionContext) -> Result<Instance> {
		let query = Query { key, ..Query::of(ty) };
		self.required(query, Some(context))
	}

	/// Locates the highest-precedence strategy accepted by `filter`. Never cached.
	pub fn locate_with_filter(&self, ty: &TypeKey, filter: &StrategyFilter) -> Result<Instance> {
		let query = Query {
			filter: Some(filter),
			..Query::of(ty)
		};
		self.required(query, None)
	}

	/// Every strategy exported as `T`, in collection order.
	pub fn locate_all<T: Any + Send + Sync>(&self) -> Result<Vec<Arc<T>>> {
		self.locate_all_instances(&TypeKey::of::<T>(), None, None)?.typed()
	}

	pub fn locate_all_with_filter(&self, ty: &TypeKey, filter: &StrategyFilter) -> Result<InstanceList> {
		self.locate_all_instances(ty, Some(filter), None)
	}

	/// Every strategy exported as `ty` and accepted by `filter`, with `prioritize` matches first.
	pub fn locate_all_instances(
		&self,
		ty: &TypeKey,
		filter: Option<&StrategyFilter>,
		prioritize: Option<&StrategyFilter>,
	) -> Result<InstanceList> {
		let array = TypeKey::array(ty.clone());
		let query = Query {
			filter,
			prioritize,
			..Query::of(&array)
		};
		let list = self.required(query, None)?;
		downcast_instance::<InstanceList>(&list, &array).map(|list| (*list).clone())
	}

	/// Returns true if `ty` has a usable strategy or is a shape the engine can always supply.
	pub fn can_locate(&self, ty: &TypeKey) -> bool {
		if ty.is_known_value() || ty.is_collection_shape() {
			return true;
		}
		let context = StaticInjectionContext::root(ty.clone());
		if self.shared.registry.can_locate(ty, &context) {
			return true;
		}
		match ty {
			TypeKey::Lazy(inner) | TypeKey::Owned(inner) => self.can_locate(inner),
			_ => ty.generic_definition().is_some_and(|def| self.shared.registry.snapshot().has_export(&def)),
		}
	}

	/// Ends the scope: children first, most recent first, then this scope's disposables in
	/// reverse order. Ending an ended scope does nothing.
	pub fn end(&self) -> std::result::Result<(), DisposalError> {
		if !self.node.mark_disposed() {
			return Ok(());
		}

		let mut failures = Vec::new();
		for child in self.node.take_children().into_iter().rev() {
			if let Some(node) = self.shared.arena.get(child)
				&& let Err(err) = Self::new(Arc::clone(&self.shared), node).end()
			{
				failures.extend(err.failures);
			}
		}

		let tracked = self.node.disposal.len();
		if let Err(err) = self.node.disposal.dispose_all() {
			failures.extend(err.failures);
		}
		self.node.singletons.clear();

		if let Some(parent) = self.node.parent.and_then(|id| self.shared.arena.get(id)) {
			parent.remove_child(self.node.id);
		}
		self.shared.arena.remove(self.node.id);

		tracing::debug!(scope = %self.node.id, name = ?self.node.name, tracked, failures = failures.len(), "lifetime scope ended");
		self.shared.observer.scope_ended(self.node.id, self.name(), tracked, failures.len());

		if failures.is_empty() { Ok(()) } else { Err(DisposalError { failures }) }
	}

	pub(crate) fn ensure_live(&self) -> Result<()> {
		if self.node.is_disposed() {
			return Err(LocateError::ScopeDisposed { scope: self.node.id });
		}
		Ok(())
	}

	fn required(&self, query: Query<'_>, context: Option<&mut InjectionContext>) -> Result<Instance> {
		self.resolve(query, context)?
			.ok_or_else(|| LocateError::NotLocated(Arc::new(StaticInjectionContext::root(query.ty.clone()))))
	}

	fn optional(&self, query: Query<'_>, context: Option<&mut InjectionContext>) -> Result<Option<Instance>> {
		match self.resolve(query, context) {
			Err(err) if err.is_root_not_located() => Ok(None),
			other => other,
		}
	}

	/// Unfiltered requests go through the producer cache; filtered ones are planned and run
	/// once.
	fn resolve(&self, query: Query<'_>, context: Option<&mut InjectionContext>) -> Result<Option<Instance>> {
		self.ensure_live()?;

		if query.filter.is_none() && query.prioritize.is_none() {
			let producer = self.shared.producer(self, query.ty, query.key)?;
			return producer.invoke(self, context);
		}

		let request = ActivationRequest::root(query.ty.clone(), query.key.cloned())
			.with_filter(query.filter.cloned())
			.with_prioritize(query.prioritize.cloned());
		let plan = PlanBuilder::new(&self.shared, self).build(&request)?;
		compiler::run_once(&plan, self, context)
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("id", &self.node.id)
			.field("name", &self.node.name)
			.field("disposed", &self.node.is_disposed())
			.finish()
	}
}
