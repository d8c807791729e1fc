//! The container: shared engine state plus the root scope.

use std::ops::Deref;
use std::sync::Arc;

use crate::activation::{ActivationRequest, PlanBuilder};
use crate::compiler::{CompiledProducer, ProducerCache};
use crate::config::ContainerConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{DisposalError, RegistryError, Result};
use crate::lifetime::{Scope, ScopeArena, ScopeNode};
use crate::observer::{ActivationObserver, TracingObserver};
use crate::registry::{RegistrationBlock, StrategyRegistry};
use crate::strategy::{ExportConfig, Strategy};
use crate::types::{LocateKey, TypeKey};

/// State shared by every scope of one container.
pub(crate) struct ContainerShared {
	pub(crate) config: ContainerConfig,
	pub(crate) registry: StrategyRegistry,
	pub(crate) producers: ProducerCache,
	pub(crate) arena: ScopeArena,
	pub(crate) root: Arc<ScopeNode>,
	pub(crate) observer: Arc<dyn ActivationObserver>,
}

impl ContainerShared {
	/// Publishes `block` and reports each new strategy to the observer.
	pub(crate) fn publish(&self, block: RegistrationBlock) -> std::result::Result<Vec<Arc<Strategy>>, RegistryError> {
		let added = self.registry.publish(block)?;
		for strategy in &added {
			self.observer.strategy_added(strategy);
		}
		Ok(added)
	}

	/// Cached producer for an unfiltered top-level request, planning and compiling on a miss.
	pub(crate) fn producer(&self, scope: &Scope, ty: &TypeKey, key: Option<&LocateKey>) -> Result<Arc<CompiledProducer>> {
		if let Some(producer) = self.producers.get(self.registry.generation(), ty, key) {
			return Ok(producer);
		}

		let mut builder = PlanBuilder::new(self, scope);
		let plan = builder.build(&ActivationRequest::root(ty.clone(), key.cloned()))?;
		let compiled = CompiledProducer::compile(ty.clone(), key.cloned(), builder.generation(), plan, self.config.execution);
		let (producer, published) = self.producers.insert(Arc::new(compiled));
		if published {
			self.observer.producer_compiled(ty, key, producer.shape());
		}
		Ok(producer)
	}
}

/// Dependency-injection container.
///
/// Dereferences to its root [`Scope`]. Dropping the container ends the root scope.
pub struct Container {
	root: Scope,
}

impl Container {
	pub fn new() -> Self {
		Self::with_config(ContainerConfig::default())
	}

	pub fn with_config(config: ContainerConfig) -> Self {
		Self::with_observer(config, Arc::new(TracingObserver))
	}

	pub fn with_observer(config: ContainerConfig, observer: Arc<dyn ActivationObserver>) -> Self {
		let arena = ScopeArena::default();
		let root = arena.insert(None, Some(Arc::from(config.label.as_str())));
		let shared = Arc::new(ContainerShared {
			registry: StrategyRegistry::new(config.keyed_duplicates),
			producers: ProducerCache::default(),
			arena,
			root: Arc::clone(&root),
			observer,
			config,
		});
		tracing::debug!(label = %shared.config.label, execution = ?shared.config.execution, "container created");
		Self {
			root: Scope::new(shared, root),
		}
	}

	/// Publishes everything `configure` adds to the block, atomically.
	pub fn configure<F>(&self, configure: F) -> std::result::Result<Vec<Arc<Strategy>>, RegistryError>
	where
		F: FnOnce(&mut RegistrationBlock),
	{
		let mut block = RegistrationBlock::new();
		configure(&mut block);
		self.shared().publish(block)
	}

	/// Publishes a single export.
	pub fn add(&self, config: ExportConfig) -> std::result::Result<Arc<Strategy>, RegistryError> {
		let mut block = RegistrationBlock::new();
		block.export(config);
		// one export in, one strategy out
		Ok(self.shared().publish(block)?.swap_remove(0))
	}

	pub fn registry(&self) -> &StrategyRegistry {
		&self.shared().registry
	}

	pub fn config(&self) -> &ContainerConfig {
		&self.shared().config
	}

	/// Static checks over the current registry.
	pub fn diagnostics(&self) -> Diagnostics {
		Diagnostics::new(self.shared().registry.snapshot())
	}

	/// Number of producers cached for the current registry generation.
	pub fn cached_producers(&self) -> usize {
		self.shared().producers.len()
	}

	/// Number of live scopes, root included.
	pub fn live_scopes(&self) -> usize {
		self.shared().arena.len()
	}

	/// Ends the root scope and with it every live scope.
	pub fn dispose(&self) -> std::result::Result<(), DisposalError> {
		self.root.end()
	}

	fn shared(&self) -> &ContainerShared {
		&self.root.shared
	}
}

impl Default for Container {
	fn default() -> Self {
		Self::new()
	}
}

impl Deref for Container {
	type Target = Scope;

	fn deref(&self) -> &Scope {
		&self.root
	}
}

impl Drop for Container {
	fn drop(&mut self) {
		if let Err(err) = self.root.end() {
			tracing::warn!(error = %err, "container disposal failed");
		}
	}
}
