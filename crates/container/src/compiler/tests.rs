use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use rstest::rstest;

use super::{CompiledProducer, ExecutionMode};
use crate::activation::{ActivationRequest, InjectionContext, PlanBuilder, PlanNode};
use crate::config::ContainerConfig;
use crate::container::Container;
use crate::descriptor::{Dependency, TypeDescriptor};
use crate::error::LocateError;
use crate::handles::{InstanceList, Lazy};
use crate::lifetime::Scope;
use crate::strategy::ExportConfig;
use crate::types::{Instance, TypeKey, instance};

fn text(value: &Instance) -> String {
	value.downcast_ref::<String>().cloned().unwrap_or_default()
}

fn constant(name: &str, value: &str) -> ExportConfig {
	let value = value.to_string();
	ExportConfig::of_type(TypeDescriptor::new(TypeKey::named(name)).constructor([], move |_| Ok(instance(value.clone()))))
}

fn producer(scope: &Scope, name: &str) -> Arc<CompiledProducer> {
	scope.shared.producer(scope, &TypeKey::named(name), None).unwrap()
}

#[test]
fn test_context_free_plans_compile_scoped() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(constant("Plain", "plain"));
			block.export(ExportConfig::factory(TypeKey::named("FromFactory"), |_, _, _| Ok(instance(String::from("factory")))));
			block.export(ExportConfig::of_type(
				TypeDescriptor::new(TypeKey::named("Greeting"))
					.constructor([Dependency::new("name", TypeKey::of::<String>()).keyed("name")], |args| {
						Ok(instance(format!("hello {}", args.get::<String>(0)?)))
					}),
			));
			block.export(ExportConfig::of_type(
				TypeDescriptor::new(TypeKey::named("Graph"))
					.constructor([Dependency::new("plain", TypeKey::named("Plain"))], |args| Ok(instance(text(args.instance(0).ok_or("missing")?)))),
			));
		})
		.unwrap();

	assert!(producer(&container, "Plain").is_scoped());
	assert!(producer(&container, "Graph").is_scoped());
	assert!(!producer(&container, "FromFactory").is_scoped());
	assert!(!producer(&container, "Greeting").is_scoped());

	let mut context = InjectionContext::new().with("name", String::from("trellis"));
	let greeting = container.locate_instance_with_context(&TypeKey::named("Greeting"), None, &mut context).unwrap();
	assert_eq!(text(&greeting), "hello trellis");
	assert_eq!(container.cached_producers(), 4);
}

#[test]
fn test_publication_invalidates_cached_producers() {
	let container = Container::new();
	container.add(constant("Mode", "first")).unwrap();

	let before = producer(&container, "Mode");
	assert_eq!(before.generation(), container.registry().generation());
	assert!(Arc::ptr_eq(&before, &producer(&container, "Mode")));

	container
		.add(ExportConfig::instance(TypeKey::named("Override"), String::from("second")).as_type(TypeKey::named("Mode")))
		.unwrap();

	let generation = container.registry().generation();
	assert!(container.shared.producers.get(generation, &TypeKey::named("Mode"), None).is_none());

	let after = producer(&container, "Mode");
	assert!(!Arc::ptr_eq(&before, &after));
	assert_eq!(after.generation(), generation);
	assert_eq!(text(&container.locate_instance(&TypeKey::named("Mode")).unwrap()), "second");
	assert_eq!(container.cached_producers(), 1);
}

#[test]
fn test_failures_are_not_cached() {
	let container = Container::new();
	container
		.add(ExportConfig::of_type(
			TypeDescriptor::new(TypeKey::named("Service"))
				.constructor([Dependency::new("db", TypeKey::named("Db"))], |_| Ok(instance(String::from("service")))),
		))
		.unwrap();

	assert!(container.locate_instance(&TypeKey::named("Service")).is_err());
	assert_eq!(container.cached_producers(), 0);

	container.add(constant("Db", "db")).unwrap();
	assert_eq!(text(&container.locate_instance(&TypeKey::named("Service")).unwrap()), "service");
	assert_eq!(container.cached_producers(), 1);
}

#[test]
fn test_failed_singleton_is_retried() {
	let failed_once = Arc::new(AtomicBool::new(false));
	let calls = Arc::new(AtomicUsize::new(0));
	let container = Container::new();
	{
		let failed_once = Arc::clone(&failed_once);
		let calls = Arc::clone(&calls);
		container
			.add(
				ExportConfig::of_type(TypeDescriptor::new(TypeKey::named("Flaky")).constructor([], move |_| {
					calls.fetch_add(1, Ordering::SeqCst);
					if !failed_once.swap(true, Ordering::SeqCst) {
						return Err("warming up".into());
					}
					Ok(instance(String::from("ready")))
				}))
				.singleton(),
			)
			.unwrap();
	}

	let err = container.locate_instance(&TypeKey::named("Flaky")).unwrap_err();
	assert!(matches!(&err, LocateError::Activation { ty, .. } if ty == &TypeKey::named("Flaky")), "{err}");
	assert_eq!(container.cached_values(), 0);

	let first = container.locate_instance(&TypeKey::named("Flaky")).unwrap();
	let second = container.locate_instance(&TypeKey::named("Flaky")).unwrap();
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_eq!(container.cached_values(), 1);
}

/// Registers a small graph touching every kind of plan node and renders what it resolves to.
fn render(mode: ExecutionMode) -> Vec<String> {
	let config = ContainerConfig {
		execution: mode,
		..ContainerConfig::default()
	};
	let container = Container::with_config(config);
	let created = Arc::new(AtomicUsize::new(0));
	{
		let created = Arc::clone(&created);
		container
			.configure(|block| {
				block.export(constant("English", "hello").as_type(TypeKey::named("Greeter")));
				block.export(constant("French", "bonjour").as_type(TypeKey::named("Greeter")));
				block.export(
					ExportConfig::of_type(TypeDescriptor::new(TypeKey::named("Counter")).constructor([], move |_| {
						Ok(instance(created.fetch_add(1, Ordering::SeqCst)))
					}))
					.singleton(),
				);
				block.export(ExportConfig::decorator_fn(TypeKey::named("Greeter"), |value| Ok(instance(format!("{}!", text(&value))))));
				block.export(ExportConfig::of_type(
					TypeDescriptor::new(TypeKey::named("Report")).constructor(
						[
							Dependency::new("greeters", TypeKey::array(TypeKey::named("Greeter"))),
							Dependency::new("counter", TypeKey::lazy(TypeKey::named("Counter"))),
							Dependency::of::<String>("suffix").optional(),
						],
						|args| {
							let greeters: Vec<String> = args.list(0)?.iter().map(text).collect();
							let counter = args.get::<Lazy>(1)?.get::<usize>()?;
							let suffix = args.optional::<String>(2)?.map(|s| s.to_string()).unwrap_or_default();
							Ok(instance(format!("{} #{counter}{suffix}", greeters.join(" "))))
						},
					),
				));
			})
			.unwrap();
	}

	let mut context = InjectionContext::new().with("suffix", String::from("?"));
	let report = container.locate_instance_with_context(&TypeKey::named("Report"), None, &mut context).unwrap();
	let plain = container.locate_instance(&TypeKey::named("Report")).unwrap();
	let greeters = container.locate_all_instances(&TypeKey::named("Greeter"), None, None).unwrap();
	let counter = container.locate_instance(&TypeKey::named("Counter")).unwrap();

	let mut rendered = vec![text(&report), text(&plain)];
	rendered.extend(greeters.iter().map(text));
	rendered.push(format!("counter {}", counter.downcast_ref::<usize>().copied().unwrap_or(usize::MAX)));
	rendered.push(format!("created {}", created.load(Ordering::SeqCst)));
	rendered
}

#[rstest]
#[case::compiled(ExecutionMode::Compiled)]
#[case::interpreted(ExecutionMode::Interpreted)]
fn test_modes_agree(#[case] mode: ExecutionMode) {
	assert_eq!(
		render(mode),
		["hello! bonjour! #0?", "hello! bonjour! #0", "hello!", "bonjour!", "counter 0", "created 1"]
	);
	assert_eq!(render(mode), render(ExecutionMode::Compiled));
}

#[test]
fn test_run_once_matches_compiled_plan() {
	let container = Container::new();
	container.add(constant("Plain", "plain")).unwrap();

	let scope: &Scope = &container;
	let plan = PlanBuilder::new(&scope.shared, scope)
		.build(&ActivationRequest::root(TypeKey::named("Plain"), None))
		.unwrap();
	assert!(matches!(plan, PlanNode::Construct { .. }));
	assert_eq!(plan.node_count(), 1);

	let once = super::run_once(&plan, scope, None).unwrap().map(|v| text(&v));
	let compiled = CompiledProducer::compile(TypeKey::named("Plain"), None, 0, plan, ExecutionMode::Compiled)
		.invoke(scope, None)
		.unwrap()
		.map(|v| text(&v));
	assert_eq!(once, compiled);
	assert_eq!(once.as_deref(), Some("plain"));
}

#[test]
fn test_array_plan_skips_nothing_and_keeps_order() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(constant("One", "1").as_type(TypeKey::named("Digit")));
			block.export(constant("Two", "2").as_type(TypeKey::named("Digit")).with_priority(10));
			block.export(constant("Three", "3").as_type(TypeKey::named("Digit")));
		})
		.unwrap();

	let list: InstanceList = container.locate_all_instances(&TypeKey::named("Digit"), None, None).unwrap();
	let digits: Vec<String> = list.iter().map(text).collect();
	assert_eq!(digits, ["1", "2", "3"]);
	assert_eq!(list.element_type(), &TypeKey::named("Digit"));
	assert_eq!(text(&container.locate_instance(&TypeKey::named("Digit")).unwrap()), "2");
}
