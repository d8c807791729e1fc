use pretty_assertions::assert_eq;

use super::*;

fn ignore(_: &Instance, _: Instance) -> std::result::Result<(), BoxError> {
	Ok(())
}

fn reported(container: &Container) -> Vec<String> {
	container.diagnostics().possible_missing_dependencies().iter().map(ToString::to_string).collect()
}

#[test]
fn test_reports_unsatisfied_required_dependencies_sorted() {
	let api = TypeDescriptor::new(named("Api"))
		.constructor([Dependency::new("unused", named("Unused"))], |_| Ok(instance(())))
		.constructor(
			[
				Dependency::new("db", named("Db")),
				Dependency::new("cache", named("Cache")).optional(),
				Dependency::new("replica", named("Db")).keyed("replica"),
				Dependency::new("plugins", TypeKey::array(named("Plugin"))),
				Dependency::new("clock", TypeKey::lazy(named("Clock"))),
				Dependency::new("later", TypeKey::lazy(named("Missing"))),
				Dependency::new("users", TypeKey::generic("Repo", [named("User")])),
				Dependency::of::<String>("endpoint"),
			],
			|_| Ok(instance(())),
		)
		.import_member(Dependency::new("tracer", named("Tracer")), ignore)
		.member(Dependency::new("theme", named("Theme")), ignore);

	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::of_type(api).with_ctor_value("endpoint", String::from("https://api")));
			block.export(composite("Worker", [Dependency::new("queue", named("Queue"))]));
			block.export(constant("Clock", "tick"));
			block.export(ExportConfig::open_generic(TypeKey::definition("Repo"), |_: &[TypeKey]| -> Option<TypeDescriptor> { None }));
		})
		.unwrap();

	assert_eq!(
		reported(&container),
		[
			"Api needs Db for db",
			"Api needs Lazy<Missing> for later",
			"Api needs Tracer for tracer",
			"Worker needs Queue for queue",
		]
	);
}

#[test]
fn test_publication_clears_reports() {
	let container = Container::new();
	container.add(composite("Worker", [Dependency::new("queue", named("Queue"))])).unwrap();
	let before = container.diagnostics();

	container.add(constant("Queue", "queue")).unwrap();

	assert_eq!(before.possible_missing_dependencies().len(), 1);
	assert!(reported(&container).is_empty());
}

#[test]
fn test_wrapped_dependency_is_checked_through_the_wrapper() {
	struct Boxed;

	impl Wrapper for Boxed {
		fn definition(&self) -> TypeKey {
			TypeKey::definition("Boxed")
		}

		fn wrap(&self, _requested: &TypeKey, inner: Instance) -> std::result::Result<Instance, BoxError> {
			Ok(inner)
		}
	}

	let container = Container::new();
	container
		.configure(|block| {
			block.wrapper(Boxed);
			block.export(composite(
				"Shop",
				[
					Dependency::new("cart", TypeKey::generic("Boxed", [named("Cart")])),
					Dependency::new("till", TypeKey::generic("Boxed", [named("Till")])),
				],
			));
			block.export(constant("Cart", "cart"));
		})
		.unwrap();

	assert_eq!(reported(&container), ["Shop needs Boxed<Till> for till"]);
}
