//! End-to-end container scenarios across registration, planning, execution and disposal.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::*;

mod diagnostics;
mod handles;
mod injection;

fn named(name: &str) -> TypeKey {
	TypeKey::named(name)
}

/// String payload of an instance, empty when it is not a `String`.
fn text(value: &Instance) -> String {
	value.downcast_ref::<String>().cloned().unwrap_or_default()
}

/// Type strategy for `name` producing `value` with no dependencies.
fn constant(name: &str, value: &str) -> ExportConfig {
	let value = value.to_string();
	ExportConfig::of_type(TypeDescriptor::new(named(name)).constructor([], move |_| Ok(instance(value.clone()))))
}

/// Type strategy for `name` rendering `name(arg, ...)` from string dependencies.
fn composite(name: &str, deps: impl IntoIterator<Item = Dependency>) -> ExportConfig {
	let label = name.to_string();
	ExportConfig::of_type(TypeDescriptor::new(named(name)).constructor(deps, move |args| {
		let parts: Vec<String> = (0..args.len()).map(|i| args.instance(i).map(text).unwrap_or_else(|| "-".into())).collect();
		Ok(instance(format!("{label}({})", parts.join(", "))))
	}))
}

fn locate_text(scope: &Scope, name: &str) -> String {
	text(&scope.locate_instance(&named(name)).unwrap())
}

/// Records every observer event as a line.
#[derive(Default)]
struct RecordingObserver {
	events: Mutex<Vec<String>>,
	compiled: AtomicUsize,
}

impl ActivationObserver for RecordingObserver {
	fn strategy_added(&self, strategy: &Strategy) {
		self.events.lock().push(format!("added {}", strategy.activation_type()));
	}

	fn producer_compiled(&self, ty: &TypeKey, key: Option<&LocateKey>, shape: PlanShape) {
		self.compiled.fetch_add(1, Ordering::SeqCst);
		let key = key.map(|k| format!(" [{k}]")).unwrap_or_default();
		self.events.lock().push(format!("compiled {ty}{key} context={}", shape.needs_context));
	}

	fn scope_ended(&self, _scope: ScopeId, name: Option<&str>, disposed: usize, failures: usize) {
		self.events.lock().push(format!("ended {} disposed={disposed} failures={failures}", name.unwrap_or("-")));
	}
}

#[test]
fn test_each_request_compiles_once() {
	let observer = Arc::new(RecordingObserver::default());
	let container = Container::with_observer(ContainerConfig::default(), Arc::clone(&observer) as Arc<dyn ActivationObserver>);
	container.add(constant("Clock", "tick").singleton()).unwrap();

	let threads = 8;
	std::thread::scope(|s| {
		for _ in 0..threads {
			s.spawn(|| {
				for _ in 0..20 {
					assert_eq!(locate_text(&container, "Clock"), "tick");
				}
			});
		}
	});

	assert_eq!(observer.compiled.load(Ordering::SeqCst), 1);
	assert_eq!(container.cached_producers(), 1);
	assert_eq!(container.cached_values(), 1);
}

#[test]
fn test_observer_sees_lifecycle() {
	let observer = Arc::new(RecordingObserver::default());
	let container = Container::with_observer(ContainerConfig::default(), Arc::clone(&observer) as Arc<dyn ActivationObserver>);
	container.add(constant("Clock", "tick").as_keyed(named("Clock"), "utc")).unwrap();

	let scope = container.begin_lifetime_scope(Some("job")).unwrap();
	scope.locate_keyed_instance(&named("Clock"), &"utc".into()).unwrap();
	scope.end().unwrap();

	assert_eq!(
		*observer.events.lock(),
		["added Clock", "compiled Clock [\"utc\"] context=false", "ended job disposed=0 failures=0"]
	);
}

#[test]
fn test_required_and_optional_location() {
	let container = Container::new();
	container.add(constant("Present", "here")).unwrap();

	assert_eq!(locate_text(&container, "Present"), "here");
	assert!(container.try_locate_instance(&named("Absent")).unwrap().is_none());
	assert!(matches!(container.locate_instance(&named("Absent")), Err(LocateError::NotLocated(_))));
	assert!(container.can_locate(&named("Present")));
	assert!(!container.can_locate(&named("Absent")));
	assert!(container.can_locate(&TypeKey::array(named("Absent"))));
	assert!(container.can_locate(&TypeKey::Scope));
}

#[test]
fn test_typed_locate_and_downcast_failure() {
	struct Port(u16);

	let container = Container::new();
	container.add(ExportConfig::instance(TypeKey::of::<Port>(), Port(8080))).unwrap();
	container
		.add(ExportConfig::instance(TypeKey::of::<u16>(), String::from("not a number")))
		.unwrap();

	assert_eq!(container.locate::<Port>().unwrap().0, 8080);
	assert!(container.try_locate::<u64>().unwrap().is_none());
	assert!(matches!(container.locate::<u16>(), Err(LocateError::Downcast { .. })));
}

#[test]
fn test_transient_and_singleton_instances() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(constant("Fresh", "fresh"));
			block.export(constant("Shared", "shared").singleton());
		})
		.unwrap();

	let fresh = || container.locate_instance(&named("Fresh")).unwrap();
	let shared = || container.locate_instance(&named("Shared")).unwrap();
	assert!(!Arc::ptr_eq(&fresh(), &fresh()));
	assert!(Arc::ptr_eq(&shared(), &shared()));
}

#[test]
fn test_scope_and_static_context_are_injectable() {
	let container = Container::new();
	container
		.add(ExportConfig::of_type(TypeDescriptor::new(named("Inspector")).constructor(
			[Dependency::new("scope", TypeKey::Scope), Dependency::new("ctx", TypeKey::StaticContext)],
			|args| {
				let scope = args.get::<Scope>(0)?;
				let ctx = args.get::<StaticInjectionContext>(1)?;
				Ok(instance(format!("{} {}", scope.name().unwrap_or("-"), ctx.activation_type())))
			},
		)))
		.unwrap();

	let scope = container.begin_lifetime_scope(Some("inner")).unwrap();
	assert_eq!(locate_text(&scope, "Inspector"), "inner StaticInjectionContext");
	assert_eq!(locate_text(&container, "Inspector"), "root StaticInjectionContext");
}
