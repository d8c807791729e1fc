use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_keyed_exports_resolve_by_key() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(constant("Primary", "primary-db").as_keyed(named("Db"), "primary"));
			block.export(constant("Replica", "replica-db").as_keyed(named("Db"), "replica"));
			block.export(composite("Reporting", [Dependency::new("db", named("Db")).keyed("replica")]));
		})
		.unwrap();

	let db = named("Db");
	assert_eq!(text(&container.locate_keyed_instance(&db, &"primary".into()).unwrap()), "primary-db");
	assert_eq!(locate_text(&container, "Reporting"), "Reporting(replica-db)");
	// keyed-only exports never answer unkeyed requests
	assert!(container.try_locate_instance(&db).unwrap().is_none());
	assert!(container.try_locate_keyed_instance(&db, &"archive".into()).unwrap().is_none());
}

#[test]
fn test_keyed_duplicate_policy_from_config() {
	let config = ContainerConfig {
		keyed_duplicates: DuplicatePolicy::LastWins,
		..ContainerConfig::default()
	};
	let container = Container::with_config(config);
	container.add(constant("Old", "old").as_keyed(named("Cache"), 1)).unwrap();
	container.add(constant("New", "new").as_keyed(named("Cache"), 1)).unwrap();
	assert_eq!(text(&container.locate_keyed_instance(&named("Cache"), &LocateKey::Int(1)).unwrap()), "new");

	let strict = Container::new();
	strict.add(constant("Old", "old").as_keyed(named("Cache"), 1)).unwrap();
	let err = strict.add(constant("New", "new").as_keyed(named("Cache"), 1)).unwrap_err();
	assert!(matches!(err, RegistryError::KeyConflict { .. }));
	assert_eq!(text(&strict.locate_keyed_instance(&named("Cache"), &LocateKey::Int(1)).unwrap()), "old");
}

#[test]
fn test_keyed_dependency_falls_back_to_extra_data() {
	let container = Container::new();
	container
		.add(ExportConfig::of_type(TypeDescriptor::new(named("Mailer")).constructor(
			[Dependency::of::<String>("host").keyed("smtp_host"), Dependency::of::<u16>("port").with_default(25u16)],
			|args| Ok(instance(format!("{}:{}", args.get::<String>(0)?, args.get::<u16>(1)?))),
		)))
		.unwrap();

	let mut context = InjectionContext::new().with("smtp_host", String::from("mail.local"));
	let mailer = container.locate_instance_with_context(&named("Mailer"), None, &mut context).unwrap();
	assert_eq!(text(&mailer), "mail.local:25");

	context.set_extra_data("port", 2525u16);
	let mailer = container.locate_instance_with_context(&named("Mailer"), None, &mut context).unwrap();
	assert_eq!(text(&mailer), "mail.local:2525");

	let err = container.locate_instance(&named("Mailer")).unwrap_err();
	let LocateError::NotLocated(missing) = &err else {
		panic!("expected not located, got {err}");
	};
	assert_eq!(missing.activation_type(), &TypeKey::of::<String>());
}

#[test]
fn test_constructor_values_override_dependencies() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(
				composite("Client", [Dependency::of::<String>("endpoint"), Dependency::of::<String>("token"), Dependency::new("log", named("Log"))])
					.with_ctor_value("endpoint", String::from("https://api"))
					.with_ctor_value_of(TypeKey::of::<String>(), String::from("secret")),
			);
			block.export(constant("Log", "stdout"));
		})
		.unwrap();

	assert_eq!(locate_text(&container, "Client"), "Client(https://api, secret, stdout)");
	assert!(container.diagnostics().possible_missing_dependencies().is_empty());
}

#[test]
fn test_members_are_injected_when_selected() {
	#[derive(Default)]
	struct Widget {
		theme: Mutex<Option<String>>,
		clock: Mutex<Option<String>>,
	}

	fn setter(field: fn(&Widget) -> &Mutex<Option<String>>) -> impl Fn(&Instance, Instance) -> std::result::Result<(), BoxError> + Send + Sync + 'static {
		move |target, value| {
			let widget = target.downcast_ref::<Widget>().ok_or("not a widget")?;
			*field(widget).lock() = Some(text(&value));
			Ok(())
		}
	}

	let descriptor = TypeDescriptor::new(named("Widget"))
		.constructor([], |_| Ok(instance(Widget::default())))
		.member(Dependency::new("theme", named("Theme")), setter(|w| &w.theme))
		.import_member(Dependency::new("clock", named("Clock")).optional(), setter(|w| &w.clock));

	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::of_type(descriptor.clone()).as_keyed(named("Widget"), "bare"));
			block.export(ExportConfig::of_type(descriptor).import_members());
			block.export(constant("Dark", "dark").as_type(named("Theme")));
		})
		.unwrap();

	let full = container.locate_instance(&named("Widget")).unwrap();
	let full = full.downcast_ref::<Widget>().unwrap();
	assert_eq!(full.theme.lock().as_deref(), Some("dark"));
	assert_eq!(full.clock.lock().as_deref(), None);

	container.add(constant("Utc", "utc").as_type(named("Clock"))).unwrap();
	let bare = container.locate_keyed_instance(&named("Widget"), &"bare".into()).unwrap();
	let bare = bare.downcast_ref::<Widget>().unwrap();
	assert_eq!(bare.theme.lock().as_deref(), None);
	assert_eq!(bare.clock.lock().as_deref(), Some("utc"));
}

#[test]
fn test_factory_sees_scope_and_contexts() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(ExportConfig::factory(named("Request"), |scope, static_ctx, ctx| {
				let user = ctx.get_extra::<String>("user")?.map(|u| u.to_string()).unwrap_or_else(|| "anonymous".into());
				let requester = static_ctx.requesting_type().map(ToString::to_string).unwrap_or_else(|| "-".into());
				Ok(instance(format!("{user} in {} for {requester}", scope.name().unwrap_or("-"))))
			}));
			block.export(composite("Handler", [Dependency::new("request", named("Request"))]));
		})
		.unwrap();

	let scope = container.begin_lifetime_scope(Some("http")).unwrap();
	let mut context = InjectionContext::new().with("user", String::from("ada"));
	let handler = scope.locate_instance_with_context(&named("Handler"), None, &mut context).unwrap();
	assert_eq!(text(&handler), "Handler(ada in http for Handler)");
	assert_eq!(locate_text(&scope, "Request"), "anonymous in http for -");
}

#[test]
fn test_injected_context_carries_extra_data() {
	let container = Container::new();
	container
		.add(ExportConfig::of_type(TypeDescriptor::new(named("Tenant")).constructor(
			[Dependency::new("context", TypeKey::Context)],
			|args| {
				let context = args.get::<InjectionContext>(0)?;
				Ok(instance(context.get_extra::<String>("tenant")?.map(|t| t.to_string()).unwrap_or_default()))
			},
		)))
		.unwrap();

	let mut context = InjectionContext::new().with("tenant", String::from("acme"));
	let tenant = container.locate_with_context::<String>(&mut context);
	assert!(matches!(tenant, Err(LocateError::NotLocated(_))));

	let tenant = container.locate_instance_with_context(&named("Tenant"), None, &mut context).unwrap();
	assert_eq!(text(&tenant), "acme");
}

#[test]
fn test_metadata_filter_and_names() {
	let container = Container::new();
	container
		.configure(|block| {
			block.export(constant("Json", "json").as_type(named("Codec")).with_metadata("mime", "application/json").as_name("json"));
			block.export(constant("Cbor", "cbor").as_type(named("Codec")).with_metadata("mime", "application/cbor").with_metadata("binary", true));
		})
		.unwrap();

	let binary = StrategyFilter::has_metadata_value("binary", true);
	let json = StrategyFilter::has_metadata_value("mime", "application/json");
	assert_eq!(text(&container.locate_with_filter(&named("Codec"), &binary).unwrap()), "cbor");
	assert_eq!(text(&container.locate_with_filter(&named("Codec"), &json).unwrap()), "json");
	assert_eq!(locate_text(&container, "Codec"), "cbor");

	let snapshot = container.registry().snapshot();
	let by_name = snapshot.named("json").and_then(|c| c.primary().cloned()).unwrap();
	assert_eq!(by_name.activation_type(), &named("Json"));
	assert_eq!(by_name.metadata("mime"), Some(&MetadataValue::from("application/json")));
}
