//! Values produced for structural request shapes.
//!
//! Array requests produce an [`InstanceList`], sequence requests a [`Sequence`] that
//! evaluates on first use, read-only requests a [`ReadOnlyList`], and lazy and owned
//! requests a [`Lazy`] or [`Owned`] handle.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::activation::StaticInjectionContext;
use crate::error::{DisposalError, LocateError, Result};
use crate::lifetime::DisposalList;
use crate::types::{Instance, TypeKey, downcast_instance};

/// Deferred evaluation captured by lazy and sequence handles.
pub(crate) type Deferred<R> = Arc<dyn Fn() -> Result<R> + Send + Sync>;

/// Collection of produced values, in collection order.
#[derive(Clone)]
pub struct InstanceList {
	element: TypeKey,
	items: Arc<[Instance]>,
}

impl InstanceList {
	pub(crate) fn new(element: TypeKey, items: impl Into<Arc<[Instance]>>) -> Self {
		Self {
			element,
			items: items.into(),
		}
	}

	/// Element type the collection was requested for.
	pub fn element_type(&self) -> &TypeKey {
		&self.element
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
		self.items.iter()
	}

	pub fn instances(&self) -> &[Instance] {
		&self.items
	}

	pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Option<Arc<T>>> {
		self.items.get(index).map(|v| downcast_instance(v, &self.element)).transpose()
	}

	/// Every element downcast to `T`.
	pub fn typed<T: Any + Send + Sync>(&self) -> Result<Vec<Arc<T>>> {
		self.items.iter().map(|v| downcast_instance(v, &self.element)).collect()
	}
}

impl<'a> IntoIterator for &'a InstanceList {
	type Item = &'a Instance;
	type IntoIter = std::slice::Iter<'a, Instance>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl fmt::Debug for InstanceList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InstanceList").field("element", &self.element).field("len", &self.items.len()).finish()
	}
}

/// Collection exposed without mutation; element access goes through [`InstanceList`].
#[derive(Clone, Debug)]
pub struct ReadOnlyList(InstanceList);

impl ReadOnlyList {
	pub(crate) fn new(list: InstanceList) -> Self {
		Self(list)
	}
}

impl Deref for ReadOnlyList {
	type Target = InstanceList;

	fn deref(&self) -> &InstanceList {
		&self.0
	}
}

/// Collection whose elements are produced on first access and then kept.
pub struct Sequence {
	element: TypeKey,
	produce: Deferred<Vec<Instance>>,
	items: Mutex<Option<InstanceList>>,
}

impl Sequence {
	pub(crate) fn new(element: TypeKey, produce: Deferred<Vec<Instance>>) -> Self {
		Self {
			element,
			produce,
			items: Mutex::new(None),
		}
	}

	/// Produces the elements on first call; later calls return the same list.
	pub fn items(&self) -> Result<InstanceList> {
		let mut items = self.items.lock();
		if let Some(list) = &*items {
			return Ok(list.clone());
		}
		let list = InstanceList::new(self.element.clone(), (self.produce)()?);
		*items = Some(list.clone());
		Ok(list)
	}

	pub fn typed<T: Any + Send + Sync>(&self) -> Result<Vec<Arc<T>>> {
		self.items()?.typed()
	}

	/// Returns true once the elements have been produced.
	pub fn is_evaluated(&self) -> bool {
		self.items.lock().is_some()
	}
}

impl fmt::Debug for Sequence {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Sequence")
			.field("element", &self.element)
			.field("evaluated", &self.is_evaluated())
			.finish()
	}
}

/// Value produced at most once, on first access.
pub struct Lazy {
	inner: TypeKey,
	produce: Deferred<Option<Instance>>,
	value: Mutex<Option<Instance>>,
}

impl Lazy {
	pub(crate) fn new(inner: TypeKey, produce: Deferred<Option<Instance>>) -> Self {
		Self {
			inner,
			produce,
			value: Mutex::new(None),
		}
	}

	/// Produces the value on first call. Failures are not kept; the next call retries.
	pub fn value(&self) -> Result<Instance> {
		let mut value = self.value.lock();
		if let Some(v) = &*value {
			return Ok(Arc::clone(v));
		}
		let Some(created) = (self.produce)()? else {
			return Err(LocateError::NotLocated(Arc::new(StaticInjectionContext::root(self.inner.clone()))));
		};
		*value = Some(Arc::clone(&created));
		Ok(created)
	}

	pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
		downcast_instance(&self.value()?, &self.inner)
	}

	pub fn is_created(&self) -> bool {
		self.value.lock().is_some()
	}
}

impl fmt::Debug for Lazy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lazy").field("inner", &self.inner).field("created", &self.is_created()).finish()
	}
}

/// Value plus everything its creation tracked for disposal.
///
/// Disposal runs on [`Owned::dispose`] or on drop, never through the enclosing scope.
pub struct Owned {
	inner: TypeKey,
	value: Instance,
	disposal: Arc<DisposalList>,
}

impl Owned {
	pub(crate) fn new(inner: TypeKey, value: Instance, disposal: Arc<DisposalList>) -> Self {
		Self { inner, value, disposal }
	}

	pub fn value(&self) -> &Instance {
		&self.value
	}

	pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
		downcast_instance(&self.value, &self.inner)
	}

	/// Number of instances waiting for disposal.
	pub fn tracked(&self) -> usize {
		self.disposal.len()
	}

	/// Disposes the tracked instances, most recent first.
	pub fn dispose(&self) -> std::result::Result<(), DisposalError> {
		self.disposal.dispose_all().map(|_| ())
	}
}

impl Drop for Owned {
	fn drop(&mut self) {
		if let Err(err) = self.dispose() {
			tracing::warn!(ty = %self.inner, error = %err, "owned value failed to dispose");
		}
	}
}

impl fmt::Debug for Owned {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Owned").field("inner", &self.inner).field("tracked", &self.tracked()).finish()
	}
}
