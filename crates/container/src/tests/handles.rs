use pretty_assertions::assert_eq;

use super::*;

struct Conn {
	closed: Arc<AtomicUsize>,
}

impl Dispose for Conn {
	fn dispose(&self) -> std::result::Result<(), BoxError> {
		self.closed.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

fn connection(closed: &Arc<AtomicUsize>) -> ExportConfig {
	let closed = Arc::clone(closed);
	ExportConfig::of_type(TypeDescriptor::new(named("Conn")).constructor([], move |_| {
		Ok(instance(Conn {
			closed: Arc::clone(&closed),
		}))
	}))
	.disposable::<Conn>()
}

fn steps(container: &Container) {
	container
		.configure(|block| {
			block.export(constant("Parse", "parse").as_type(named("Step")));
			block.export(constant("Check", "check").as_type(named("Step")).with_metadata("phase", "late"));
			block.export(constant("Emit", "emit").as_type(named("Step")).with_metadata("phase", "late"));
		})
		.unwrap();
}

#[test]
fn test_owned_value_disposes_with_its_handle() {
	let closed = Arc::new(AtomicUsize::new(0));
	let container = Container::new();
	container.add(connection(&closed)).unwrap();
	let scope = container.begin_lifetime_scope(None).unwrap();

	let owned = scope.locate_instance(&TypeKey::owned(named("Conn"))).unwrap();
	let handle = owned.downcast_ref::<Owned>().unwrap();
	assert!(handle.get::<Conn>().is_ok());
	assert_eq!(handle.tracked(), 1);
	assert_eq!(scope.tracked_disposables(), 0);

	handle.dispose().unwrap();
	assert_eq!(closed.load(Ordering::SeqCst), 1);
	assert_eq!(handle.tracked(), 0);

	let dropped = scope.locate_instance(&TypeKey::owned(named("Conn"))).unwrap();
	drop(dropped);
	assert_eq!(closed.load(Ordering::SeqCst), 2);

	scope.end().unwrap();
	assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_lazy_defers_creation() {
	let created = Arc::new(AtomicUsize::new(0));
	let container = Container::new();
	{
		let created = Arc::clone(&created);
		container
			.add(ExportConfig::of_type(TypeDescriptor::new(named("Report")).constructor([], move |_| {
				Ok(instance(created.fetch_add(1, Ordering::SeqCst) + 1))
			})))
			.unwrap();
	}

	let value = container.locate_instance(&TypeKey::lazy(named("Report"))).unwrap();
	let lazy = value.downcast_ref::<Lazy>().unwrap();
	assert!(!lazy.is_created());
	assert_eq!(created.load(Ordering::SeqCst), 0);

	assert_eq!(*lazy.get::<usize>().unwrap(), 1);
	assert_eq!(*lazy.get::<usize>().unwrap(), 1);
	assert!(lazy.is_created());
	assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_lazy_refuses_an_ended_scope() {
	let container = Container::new();
	container.add(constant("Report", "report")).unwrap();
	let scope = container.begin_lifetime_scope(None).unwrap();

	let value = scope.locate_instance(&TypeKey::lazy(named("Report"))).unwrap();
	scope.end().unwrap();

	let lazy = value.downcast_ref::<Lazy>().unwrap();
	assert!(matches!(lazy.value(), Err(LocateError::ScopeDisposed { .. })));
}

#[test]
fn test_lazy_of_missing_type() {
	let container = Container::new();
	container
		.add(composite("Holder", [Dependency::new("later", TypeKey::lazy(named("Missing"))).optional()]))
		.unwrap();

	assert!(matches!(
		container.locate_instance(&TypeKey::lazy(named("Missing"))),
		Err(LocateError::NotLocated(_))
	));
	assert_eq!(locate_text(&container, "Holder"), "Holder(-)");
}

#[test]
fn test_sequence_evaluates_on_first_use() {
	let container = Container::new();
	steps(&container);

	let value = container.locate_instance(&TypeKey::sequence(named("Step"))).unwrap();
	let sequence = value.downcast_ref::<Sequence>().unwrap();
	assert!(!sequence.is_evaluated());

	let first = sequence.items().unwrap();
	let rendered: Vec<String> = first.iter().map(text).collect();
	assert_eq!(rendered, ["parse", "check", "emit"]);
	assert!(sequence.is_evaluated());

	let again = sequence.items().unwrap();
	assert!(first.iter().zip(again.iter()).all(|(a, b)| Arc::ptr_eq(a, b)));
	assert_eq!(sequence.typed::<String>().unwrap().len(), 3);
}

#[test]
fn test_read_only_and_filtered_collections() {
	let container = Container::new();
	steps(&container);

	let value = container.locate_instance(&TypeKey::read_only(named("Step"))).unwrap();
	let view = value.downcast_ref::<ReadOnlyList>().unwrap();
	assert_eq!(view.len(), 3);
	assert_eq!(view.get::<String>(0).unwrap().as_deref().map(String::as_str), Some("parse"));

	let late = StrategyFilter::has_metadata_value("phase", "late");
	let filtered = container.locate_all_with_filter(&named("Step"), &late).unwrap();
	assert_eq!(filtered.typed::<String>().unwrap().iter().map(|s| s.as_str()).collect::<Vec<_>>(), ["check", "emit"]);

	let emit_first = StrategyFilter::activation_name_ends_with("Emit");
	let ordered = container.locate_all_instances(&named("Step"), None, Some(&emit_first)).unwrap();
	assert_eq!(ordered.iter().map(text).collect::<Vec<_>>(), ["emit", "parse", "check"]);

	assert!(container.locate_all::<String>().unwrap().is_empty());
}

#[test]
fn test_empty_collection_is_not_an_error() {
	let container = Container::new();
	let list = container.locate_all_instances(&named("Plugin"), None, None).unwrap();
	assert!(list.is_empty());
	assert_eq!(list.element_type(), &named("Plugin"));
}
