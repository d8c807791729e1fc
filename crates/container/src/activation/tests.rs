use std::sync::{Arc, Barrier};
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

use super::{DescriptorCatalog, MissingStrategyProvider, StaticInjectionContext};
use crate::container::Container;
use crate::descriptor::{Dependency, TypeDescriptor};
use crate::error::LocateError;
use crate::strategy::{ExportConfig, StrategyFilter};
use crate::types::{LocateKey, TypeKey, instance};

#[derive(Debug, Clone, PartialEq)]
struct Label(String);

fn label(text: &str) -> Label {
	Label(text.to_string())
}

/// Type strategy for `name` whose constructor takes `deps` and yields a [`Label`] of `name`.
fn labelled(name: &str, deps: impl IntoIterator<Item = Dependency>) -> TypeDescriptor {
	let text = name.to_string();
	TypeDescriptor::new(TypeKey::named(name)).constructor(deps, move |_| Ok(instance(label(&text))))
}

/// [`Label`] joining the constructor's first argument under `name`.
fn wrapping(name: &str, dep: Dependency) -> TypeDescriptor {
	let text = name.to_string();
	TypeDescriptor::new(TypeKey::named(name)).constructor([dep], move |args| {
		let inner = args.get::<Label>(0)?;
		Ok(instance(Label(format!("{text}({})", inner.0))))
	})
}

#[test]
fn test_cycle_is_reported_with_chain() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::of_type(labelled("A", [Dependency::new("b", TypeKey::named("B"))])));
			block.export(ExportConfig::of_type(labelled("B", [Dependency::new("a", TypeKey::named("A"))])));
		})
		.unwrap();

	let err = container.locate_instance(&TypeKey::named("A")).unwrap_err();
	let LocateError::DependencyCycle { chain } = &err else {
		panic!("expected a cycle, got {err}");
	};
	assert_eq!(chain, &[TypeKey::named("A"), TypeKey::named("B"), TypeKey::named("A")]);
	assert_eq!(err.to_string(), "dependency cycle: A -> B -> A");
	assert_eq!(container.cached_producers(), 0);
}

#[test]
fn test_cycle_through_lazy_is_still_reported() {
	let container = Container::new();
	container
		.add(ExportConfig::of_type(labelled("Node", [Dependency::new("next", TypeKey::lazy(TypeKey::named("Node")))])))
		.unwrap();

	let err = container.locate_instance(&TypeKey::named("Node")).unwrap_err();
	assert!(matches!(err, LocateError::DependencyCycle { .. }), "{err}");
}

#[test]
fn test_condition_selects_by_requesting_type() {
	let logger = TypeKey::named("Logger");
	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::of_type(labelled("ConsoleLogger", [])).as_type(logger.clone()));
			block.export(
				ExportConfig::of_type(labelled("FileLogger", []))
					.as_type(logger.clone())
					.when_injected_into(TypeKey::named("Audit")),
			);
			block.export(ExportConfig::of_type(wrapping("Audit", Dependency::new("logger", logger.clone()))));
			block.export(ExportConfig::of_type(wrapping("Report", Dependency::new("logger", logger.clone()))));
		})
		.unwrap();

	let audit = container.locate_instance(&TypeKey::named("Audit")).unwrap();
	let report = container.locate_instance(&TypeKey::named("Report")).unwrap();
	let direct = container.locate_instance(&logger).unwrap();

	assert_eq!(audit.downcast_ref::<Label>(), Some(&label("Audit(FileLogger)")));
	assert_eq!(report.downcast_ref::<Label>(), Some(&label("Report(ConsoleLogger)")));
	assert_eq!(direct.downcast_ref::<Label>(), Some(&label("ConsoleLogger")));
}

#[test]
fn test_unless_condition_inverts() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::of_type(labelled("Fallback", [])).as_type(TypeKey::named("Store")));
			block.export(
				ExportConfig::of_type(labelled("Nested", []))
					.as_type(TypeKey::named("Store"))
					.unless(|ctx: &StaticInjectionContext| ctx.requesting_type().is_none()),
			);
			block.export(ExportConfig::of_type(wrapping("Owner", Dependency::new("store", TypeKey::named("Store")))));
		})
		.unwrap();

	let root = container.locate_instance(&TypeKey::named("Store")).unwrap();
	let owner = container.locate_instance(&TypeKey::named("Owner")).unwrap();
	assert_eq!(root.downcast_ref::<Label>(), Some(&label("Fallback")));
	assert_eq!(owner.downcast_ref::<Label>(), Some(&label("Owner(Nested)")));
}

#[test]
fn test_missing_required_dependency_names_the_chain() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::of_type(labelled("Service", [Dependency::new("repo", TypeKey::named("Repo"))])));
			block.export(ExportConfig::of_type(labelled("Repo", [Dependency::new("db", TypeKey::named("Db"))])));
		})
		.unwrap();

	let err = container.locate_instance(&TypeKey::named("Service")).unwrap_err();
	let LocateError::NotLocated(context) = &err else {
		panic!("expected not located, got {err}");
	};
	assert_eq!(context.activation_type(), &TypeKey::named("Db"));
	assert_eq!(
		err.to_string(),
		"could not locate type Db\n1 importing Db for constructor parameter db of Repo\n2 importing Repo for constructor parameter repo of Service"
	);

	// a missing dependency is still an error for the optional form
	assert!(container.try_locate_instance(&TypeKey::named("Service")).is_err());
	assert!(container.try_locate_instance(&TypeKey::named("Db")).unwrap().is_none());
}

#[test]
fn test_longest_satisfiable_constructor_wins() {
	let container = Container::new();
	let descriptor = TypeDescriptor::new(TypeKey::named("Client"))
		.constructor([], |_| Ok(instance(label("default"))))
		.constructor([Dependency::of::<u16>("port")], |args| Ok(instance(Label(format!("port {}", args.get::<u16>(0)?)))))
		.constructor([Dependency::of::<u16>("port"), Dependency::of::<String>("host")], |args| {
			Ok(instance(Label(format!("{}:{}", args.get::<String>(1)?, args.get::<u16>(0)?))))
		});
	container.add(ExportConfig::of_type(descriptor)).unwrap();

	let client = || container.locate_instance(&TypeKey::named("Client")).unwrap();
	assert_eq!(client().downcast_ref::<Label>(), Some(&label("default")));

	container.add(ExportConfig::instance(TypeKey::of::<u16>(), 8080u16)).unwrap();
	assert_eq!(client().downcast_ref::<Label>(), Some(&label("port 8080")));

	container.add(ExportConfig::instance(TypeKey::of::<String>(), String::from("localhost"))).unwrap();
	assert_eq!(client().downcast_ref::<Label>(), Some(&label("localhost:8080")));
}

#[test]
fn test_optional_dependency_uses_default() {
	let container = Container::new();
	let descriptor = TypeDescriptor::new(TypeKey::named("Pool")).constructor(
		[Dependency::of::<usize>("size").with_default(4usize), Dependency::of::<String>("name").optional()],
		|args| {
			let size = args.get::<usize>(0)?;
			let name = args.optional::<String>(1)?;
			Ok(instance(Label(format!("{size} {}", name.as_deref().map_or("unnamed", String::as_str)))))
		},
	);
	container.add(ExportConfig::of_type(descriptor)).unwrap();

	let pool = container.locate_instance(&TypeKey::named("Pool")).unwrap();
	assert_eq!(pool.downcast_ref::<Label>(), Some(&label("4 unnamed")));
}

#[test]
fn test_filter_rejecting_every_candidate_is_ambiguous() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::of_type(labelled("Red", [])).as_type(TypeKey::named("Color")));
			block.export(ExportConfig::of_type(labelled("Blue", [])).as_type(TypeKey::named("Color")).with_metadata("cool", true));
		})
		.unwrap();

	let cool = StrategyFilter::has_metadata_value("cool", true);
	let blue = container.locate_with_filter(&TypeKey::named("Color"), &cool).unwrap();
	assert_eq!(blue.downcast_ref::<Label>(), Some(&label("Blue")));

	let err = container
		.locate_with_filter(&TypeKey::named("Color"), &StrategyFilter::has_metadata("warm"))
		.unwrap_err();
	assert!(matches!(err, LocateError::AmbiguousPrimary { candidates: 2, .. }), "{err}");
	assert_eq!(container.cached_producers(), 0);
}

#[test]
fn test_provider_registers_missing_type() {
	let catalog = DescriptorCatalog::new([labelled("Repo", [])]);
	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::of_type(wrapping("Service", Dependency::new("repo", TypeKey::named("Repo")))));
			block.missing_strategy_provider(catalog);
		})
		.unwrap();
	let generation = container.registry().generation();
	assert!(container.registry().primary(&TypeKey::named("Repo")).is_none());

	let service = container.locate_instance(&TypeKey::named("Service")).unwrap();

	assert_eq!(service.downcast_ref::<Label>(), Some(&label("Service(Repo)")));
	assert!(container.registry().primary(&TypeKey::named("Repo")).is_some());
	assert_eq!(container.registry().generation(), generation + 1);
	assert!(container.can_locate(&TypeKey::named("Repo")));
}

#[test]
fn test_provider_publishes_once_across_scopes() {
	const THREADS: usize = 8;

	let container = Container::new();
	container
		.configure(|block| {
			block.missing_strategy_provider(DescriptorCatalog::new([labelled("Repo", [])]));
		})
		.unwrap();
	let generation = container.registry().generation();
	let scopes: Vec<_> = (0..THREADS).map(|_| container.begin_lifetime_scope(None).unwrap()).collect();
	let start = Barrier::new(THREADS);

	std::thread::scope(|s| {
		for scope in &scopes {
			let start = &start;
			s.spawn(move || {
				start.wait();
				scope.locate_instance(&TypeKey::named("Repo")).unwrap();
			});
		}
	});

	let repo = TypeKey::named("Repo");
	assert_eq!(container.registry().collection(&repo).map(|c| c.len()), Some(1));
	assert_eq!(container.registry().generation(), generation + 1);
	assert_eq!(container.locate_all_instances(&repo, None, None).unwrap().len(), 1);
}

struct CountingProvider {
	calls: Arc<AtomicUsize>,
}

impl MissingStrategyProvider for CountingProvider {
	fn provide(&self, ty: &TypeKey, key: Option<&LocateKey>, _context: &StaticInjectionContext) -> Vec<ExportConfig> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		match (ty, key) {
			(TypeKey::Named(name), Some(key)) if &**name == "Setting" => {
				vec![ExportConfig::instance(ty.clone(), key.to_string()).as_keyed(ty.clone(), key.clone())]
			}
			_ => Vec::new(),
		}
	}
}

#[test]
fn test_provider_supplies_keyed_exports_once() {
	let calls = Arc::new(AtomicUsize::new(0));
	let container = Container::new();
	container
		.configure(|block| {
			block.missing_strategy_provider(CountingProvider { calls: Arc::clone(&calls) });
		})
		.unwrap();

	let setting = TypeKey::named("Setting");
	let key = LocateKey::from("timeout");
	let first = container.locate_keyed_instance(&setting, &key).unwrap();
	let second = container.locate_keyed_instance(&setting, &key).unwrap();

	assert_eq!(first.downcast_ref::<String>().map(String::as_str), Some("\"timeout\""));
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	assert!(container.try_locate_instance(&TypeKey::named("Unknown")).unwrap().is_none());
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}
