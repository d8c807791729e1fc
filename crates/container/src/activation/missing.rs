use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::StaticInjectionContext;
use crate::descriptor::TypeDescriptor;
use crate::strategy::ExportConfig;
use crate::types::{LocateKey, TypeKey};

/// Late-bound collaborator asked for strategies when a request cannot be satisfied.
///
/// Called under the invoking scope's activation lock and the root scope's. Returned
/// configurations are published before the request is retried.
pub trait MissingStrategyProvider: Send + Sync {
	fn provide(&self, ty: &TypeKey, key: Option<&LocateKey>, context: &StaticInjectionContext) -> Vec<ExportConfig>;
}

/// Descriptors supplied by a type discovery collaborator.
///
/// Provides a transient self-export for any concrete type it describes that nothing else
/// exports.
#[derive(Default)]
pub struct DescriptorCatalog {
	descriptors: RwLock<FxHashMap<TypeKey, Arc<TypeDescriptor>>>,
}

impl DescriptorCatalog {
	pub fn new(descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Self {
		let catalog = Self::default();
		catalog.extend(descriptors);
		catalog
	}

	pub fn extend(&self, descriptors: impl IntoIterator<Item = TypeDescriptor>) {
		let mut map = self.descriptors.write();
		for descriptor in descriptors {
			map.insert(descriptor.ty.clone(), Arc::new(descriptor));
		}
	}

	pub fn len(&self) -> usize {
		self.descriptors.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptors.read().is_empty()
	}
}

impl MissingStrategyProvider for DescriptorCatalog {
	fn provide(&self, ty: &TypeKey, key: Option<&LocateKey>, _context: &StaticInjectionContext) -> Vec<ExportConfig> {
		if key.is_some() {
			return Vec::new();
		}
		let Some(descriptor) = self.descriptors.read().get(ty).cloned() else {
			return Vec::new();
		};
		tracing::debug!(ty = %ty, "catalog provides missing strategy");
		vec![ExportConfig::of_type(TypeDescriptor::clone(&descriptor))]
	}
}
