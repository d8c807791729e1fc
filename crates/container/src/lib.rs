//! Activation engine for dependency injection.
//!
//! Strategies describe how to produce values for symbolic [`TypeKey`]s. They are published
//! in [`RegistrationBlock`]s into an immutable registry snapshot. A top-level request is
//! planned once into a [`PlanNode`] tree, compiled into a cached producer and then executed
//! against a [`Scope`], which owns lifestyle caches and disposal.
//!
//! - [`registry`]: snapshots, collections and precedence rules
//! - [`activation`]: request planning, wrappers, decorators and injection contexts
//! - [`compiler`]: plan lowering and the producer cache
//! - [`lifetime`]: scope tree, singleton caches and disposal
//! - [`Container`]: root scope plus configuration entry points
//!
//! ```
//! use trellis_container::{Container, ExportConfig, TypeDescriptor, instance};
//!
//! struct Clock;
//!
//! let container = Container::new();
//! container
//! 	.add(ExportConfig::of_type(TypeDescriptor::of::<Clock>().constructor([], |_| Ok(instance(Clock)))).singleton())
//! 	.unwrap();
//! let a = container.locate::<Clock>().unwrap();
//! let b = container.locate::<Clock>().unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! ```

pub mod activation;
pub mod compiler;
mod config;
mod container;
mod descriptor;
mod diagnostics;
mod error;
mod handles;
pub mod lifetime;
mod observer;
pub mod registry;
pub mod strategy;
mod types;

pub use activation::{
	ActivationRequest, DescriptorCatalog, InjectionContext, InjectionTarget, InjectionTargetInfo, MissingStrategyProvider, PlanNode,
	PlanShape, StaticInjectionContext, Wrapper,
};
pub use compiler::ExecutionMode;
pub use config::ContainerConfig;
pub use container::Container;
pub use descriptor::{Arguments, ConstructorDescriptor, Dependency, GenericDescriptor, MemberDescriptor, TypeDescriptor};
pub use diagnostics::{Diagnostics, MissingDependency};
pub use error::{DisposalError, DisposalFailure, LocateError, RegistryError, Result, SharedError};
pub use handles::{InstanceList, Lazy, Owned, ReadOnlyList, Sequence};
pub use lifetime::{LifestyleKey, Scope, ScopeId};
pub use observer::{ActivationObserver, TracingObserver};
pub use registry::{DuplicatePolicy, RegistrationBlock, RegistrySnapshot, StrategyCollection, StrategyRegistry};
pub use strategy::{
	CtorValue, DecorateFn, DecoratorRole, Dispose, Disposer, ExportConfig, FactoryFn, Lifestyle, MemberSelector, MetadataValue,
	Strategy, StrategyFilter, StrategyId, StrategyKind,
};
pub use types::{BoxError, Instance, LocateKey, TypeKey, downcast_instance, instance};

#[cfg(test)]
mod tests;
