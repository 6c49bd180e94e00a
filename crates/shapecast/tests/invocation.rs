use std::sync::Arc;

use parking_lot::Mutex;
use shapecast::{
    Callable, CastConfig, CastContext, CastError, Descriptor, IndexMap, LookupError, Mismatch,
    Namespace, NamespaceRegistry, ObjectValue, Param, Signature, SymbolPathDescriptor,
    Value, cast, cast_with,
};

#[derive(Debug, PartialEq)]
struct Widget {
    args: Vec<Value>,
    kwargs: IndexMap<String, Value>,
}

fn widget() -> Callable {
    Callable::new("Widget", |args, kwargs| {
        Ok(Value::Object(ObjectValue::new("Widget", Widget { args, kwargs })))
    })
}

fn gadget() -> Callable {
    Callable::with_signature(
        "Gadget",
        Signature::new([
            Param::typed("size", Descriptor::int()),
            Param::typed("label", Descriptor::text()).with_default(Value::text("plain")),
        ]),
        |_, kwargs| Ok(Value::Map(Arc::new(
            kwargs
                .into_iter()
                .map(|(name, value)| (shapecast::KeyValue::Text(name), value))
                .collect(),
        ))),
    )
}

fn registry() -> NamespaceRegistry {
    NamespaceRegistry::new()
        .with_namespace(
            Namespace::new("mod")
                .with_callable(widget())
                .with_callable(gadget())
                .with_member("answer", Value::Int(42))
                .with_namespace(Namespace::new("nested").with_callable(widget())),
        )
        .with_namespace(Namespace::new("other").with_callable(widget()))
}

fn ctx() -> CastContext {
    CastContext::new().with_namespaces(registry())
}

fn explicit(path: SymbolPathDescriptor) -> Descriptor {
    Descriptor::invocation(
        Descriptor::symbol_path(path),
        Descriptor::list_of(Descriptor::any()),
        Descriptor::map_of(Descriptor::text(), Descriptor::any()),
    )
}

fn built(value: &Value) -> &Widget {
    match value {
        Value::Object(object) => object.downcast_ref::<Widget>().expect("a widget"),
        other => panic!("expected a widget, found {other:?}"),
    }
}

fn reason(err: &CastError) -> Option<Mismatch> {
    err.as_coercion().map(|err| err.reason.clone())
}

// -----------------------------------------------------------------------------
// Symbol paths
// -----------------------------------------------------------------------------

#[test]
fn symbol_paths_resolve_members() {
    let any = Descriptor::symbol_path(SymbolPathDescriptor::any());
    assert_eq!(
        cast_with(&any, &Value::text("mod.answer"), &ctx()).ok(),
        Some(Value::Int(42))
    );
    assert!(matches!(
        cast_with(&any, &Value::text("mod.nested.Widget"), &ctx()),
        Ok(Value::Callable(_))
    ));
}

#[test]
fn unknown_roots_and_members_are_lookup_errors() {
    let any = Descriptor::symbol_path(SymbolPathDescriptor::any());
    let err = cast_with(&any, &Value::text("nope.Widget"), &ctx()).expect_err("no root");
    assert!(matches!(
        err,
        CastError::Lookup(LookupError::UnknownRoot { ref root }) if root == "nope"
    ));
    let err = cast_with(&any, &Value::text("mod.Missing"), &ctx()).expect_err("no member");
    assert!(err.is_lookup());
}

#[test]
fn malformed_paths_are_coercion_errors() {
    let any = Descriptor::symbol_path(SymbolPathDescriptor::any());
    for path in ["", "mod.", ".Widget", "mod..Widget"] {
        let err = cast_with(&any, &Value::text(path), &ctx()).expect_err("malformed");
        assert_eq!(reason(&err), Some(Mismatch::MalformedSymbolPath), "path {path:?}");
    }
    let err = cast_with(&any, &Value::Int(3), &ctx()).expect_err("not text");
    assert_eq!(reason(&err), Some(Mismatch::WrongKind));
}

#[test]
fn allow_lists_restrict_roots_and_names() {
    let only = Descriptor::symbol_path(SymbolPathDescriptor::only(["mod"], ["Widget"]));
    assert!(cast_with(&only, &Value::text("mod.Widget"), &ctx()).is_ok());

    let err = cast_with(&only, &Value::text("mod.Gadget"), &ctx()).expect_err("name not allowed");
    assert_eq!(reason(&err), Some(Mismatch::SymbolNotAllowed));

    let err = cast_with(&only, &Value::text("other.Widget"), &ctx()).expect_err("root not allowed");
    assert_eq!(reason(&err), Some(Mismatch::SymbolNotAllowed));
}

#[test]
fn relative_paths_try_candidate_roots_in_order() {
    let roots = Descriptor::symbol_path(SymbolPathDescriptor::roots(["other", "mod"]));
    let resolved = cast_with(&roots, &Value::text("Widget"), &ctx()).expect("under other");
    assert!(matches!(resolved, Value::Callable(ref callable) if callable.name() == "Widget"));
    assert_eq!(
        cast_with(&roots, &Value::text("answer"), &ctx()).ok(),
        Some(Value::Int(42))
    );

    let err = cast_with(&roots, &Value::text("Missing"), &ctx()).expect_err("nowhere");
    assert_eq!(reason(&err), Some(Mismatch::SymbolNotAllowed));
}

#[test]
fn registered_roots_outside_the_allow_list_are_rejected() {
    let only_mod = Descriptor::symbol_path(SymbolPathDescriptor::roots(["mod"]));
    let err = cast_with(&only_mod, &Value::text("other.Widget"), &ctx()).expect_err("other");
    assert_eq!(reason(&err), Some(Mismatch::SymbolNotAllowed));
    assert_eq!(err.as_coercion().map(|err| err.path.as_str()), Some("$"));
}

#[test]
fn allowed_roots_that_are_not_registered_are_lookup_errors() {
    let ghost = Descriptor::symbol_path(SymbolPathDescriptor::roots(["ghost"]));
    let err = cast_with(&ghost, &Value::text("ghost.Widget"), &ctx()).expect_err("no ghost");
    assert!(matches!(
        err,
        CastError::Lookup(LookupError::UnknownRoot { ref root }) if root == "ghost"
    ));
}

#[test]
fn path_lists_reject_crossed_roots_and_names() {
    let pairs = Descriptor::symbol_path(SymbolPathDescriptor::only_paths([
        "mod.Widget",
        "other.Gadget",
    ]));
    assert!(cast_with(&pairs, &Value::text("mod.Widget"), &ctx()).is_ok());
    for crossed in ["other.Widget", "mod.Gadget"] {
        let err = cast_with(&pairs, &Value::text(crossed), &ctx()).expect_err("crossed pair");
        assert_eq!(reason(&err), Some(Mismatch::SymbolNotAllowed), "path {crossed:?}");
    }
}

#[test]
fn unions_of_invocations_fall_through_to_the_allowed_root() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let record = |root: &'static str| {
        let calls = Arc::clone(&calls);
        Callable::new("Widget", move |_, _| {
            calls.lock().push(root);
            Ok(Value::text(root))
        })
    };
    let ctx = CastContext::new().with_namespaces(
        NamespaceRegistry::new()
            .with_namespace(Namespace::new("mod").with_callable(record("mod")))
            .with_namespace(Namespace::new("other").with_callable(record("other"))),
    );
    let descriptor = Descriptor::union_of([
        explicit(SymbolPathDescriptor::roots(["mod"])),
        explicit(SymbolPathDescriptor::roots(["other"])),
    ]);
    let envelope = Value::map([("fn", Value::text("other.Widget"))]);
    assert_eq!(
        cast_with(&descriptor, &envelope, &ctx).ok(),
        Some(Value::text("other"))
    );
    assert_eq!(*calls.lock(), vec!["other"]);
}

// -----------------------------------------------------------------------------
// Explicit invocation
// -----------------------------------------------------------------------------

#[test]
fn explicit_invocation_calls_the_resolved_constructor() {
    let descriptor = explicit(SymbolPathDescriptor::any());
    let envelope = Value::from_json_str(r#"{"fn": "mod.Widget", "args": [], "kwargs": {"a": 1}}"#)
        .expect("valid json");
    let coerced = cast_with(&descriptor, &envelope, &ctx()).expect("widget built");
    let mut kwargs = IndexMap::new();
    kwargs.insert("a".to_string(), Value::Int(1));
    assert_eq!(
        built(&coerced),
        &Widget {
            args: vec![],
            kwargs,
        }
    );
}

#[test]
fn missing_args_and_kwargs_default_to_empty() {
    let descriptor = explicit(SymbolPathDescriptor::any());
    let coerced = cast_with(&descriptor, &Value::map([("fn", Value::text("mod.Widget"))]), &ctx())
        .expect("widget built");
    let widget = built(&coerced);
    assert!(widget.args.is_empty());
    assert!(widget.kwargs.is_empty());
}

#[test]
fn positional_arguments_are_coerced_by_their_descriptor() {
    let descriptor = Descriptor::invocation(
        Descriptor::symbol_path(SymbolPathDescriptor::any()),
        Descriptor::tuple_of([Descriptor::int(), Descriptor::text()]),
        Descriptor::map_of(Descriptor::text(), Descriptor::any()),
    );
    let envelope = Value::map([
        ("fn", Value::text("mod.Widget")),
        ("args", Value::list([Value::Int(1), Value::text("two")])),
    ]);
    let coerced = cast_with(&descriptor, &envelope, &ctx()).expect("widget built");
    assert_eq!(built(&coerced).args, vec![Value::Int(1), Value::text("two")]);

    let bad = Value::map([
        ("fn", Value::text("mod.Widget")),
        ("args", Value::list([Value::text("one"), Value::text("two")])),
    ]);
    let err = cast_with(&descriptor, &bad, &ctx()).expect_err("text in int slot");
    assert_eq!(err.as_coercion().map(|err| err.path.as_str()), Some("$.args[0]"));
}

#[test]
fn missing_callable_key_is_a_coercion_error() {
    let descriptor = explicit(SymbolPathDescriptor::any());
    let err = cast_with(&descriptor, &Value::map([("kwargs", Value::empty_map())]), &ctx())
        .expect_err("no fn");
    assert_eq!(
        reason(&err),
        Some(Mismatch::MissingCallableKey { key: "fn".into() })
    );
}

#[test]
fn envelope_keys_follow_the_configuration() {
    let config = CastConfig::from_toml_str("[envelope]\ncallable = \"target\"\n").expect("config");
    let ctx = ctx().with_config(config);
    let descriptor = explicit(SymbolPathDescriptor::any());
    let coerced = cast_with(&descriptor, &Value::map([("target", Value::text("mod.Widget"))]), &ctx)
        .expect("widget built");
    assert!(built(&coerced).kwargs.is_empty());
}

#[test]
fn resolving_to_a_non_callable_is_a_coercion_error() {
    let descriptor = explicit(SymbolPathDescriptor::any());
    let err = cast_with(&descriptor, &Value::map([("fn", Value::text("mod.answer"))]), &ctx())
        .expect_err("42 is not callable");
    let coercion = err.as_coercion().expect("coercion error");
    assert_eq!(coercion.reason, Mismatch::NotCallable);
    assert_eq!(coercion.path, "$.fn");
}

#[test]
fn kwargs_descriptor_must_produce_a_mapping() {
    let descriptor = Descriptor::invocation(
        Descriptor::symbol_path(SymbolPathDescriptor::any()),
        Descriptor::list_of(Descriptor::any()),
        Descriptor::any(),
    );
    let envelope = Value::map([
        ("fn", Value::text("mod.Widget")),
        ("kwargs", Value::list([Value::Int(1)])),
    ]);
    let err = cast_with(&descriptor, &envelope, &ctx()).expect_err("list kwargs");
    assert!(err.is_config());
}

#[test]
fn invocation_path_must_be_a_symbol_path() {
    let descriptor = Descriptor::invocation(
        Descriptor::text(),
        Descriptor::list_of(Descriptor::any()),
        Descriptor::map_of(Descriptor::text(), Descriptor::any()),
    );
    let err = shapecast::compile(&descriptor, &ctx()).expect_err("text path");
    assert!(err.is_config());
}

#[test]
fn host_errors_from_the_callable_propagate() {
    let failing = Callable::new("Broken", |_, _| Err("constructor failed".into()));
    let ctx = CastContext::new().with_namespaces(
        NamespaceRegistry::new().with_namespace(Namespace::new("mod").with_callable(failing)),
    );
    let err = cast_with(
        &explicit(SymbolPathDescriptor::any()),
        &Value::map([("fn", Value::text("mod.Broken"))]),
        &ctx,
    )
    .expect_err("callable fails");
    assert!(matches!(err, CastError::Host(_)));
    assert_eq!(err.to_string(), "constructor failed");
}

// -----------------------------------------------------------------------------
// Inspected invocation
// -----------------------------------------------------------------------------

#[test]
fn inspected_invocation_coerces_kwargs_from_the_signature() {
    let descriptor = Descriptor::inspected_invocation(Descriptor::symbol_path(
        SymbolPathDescriptor::any(),
    ));
    let envelope = Value::from_json_str(r#"{"fn": "mod.Gadget", "kwargs": {"size": 3}}"#)
        .expect("valid json");
    let coerced = cast_with(&descriptor, &envelope, &ctx()).expect("gadget built");
    assert_eq!(
        coerced,
        Value::map([("size", Value::Int(3)), ("label", Value::text("plain"))])
    );

    let wrong = Value::from_json_str(r#"{"fn": "mod.Gadget", "kwargs": {"size": "3"}}"#)
        .expect("valid json");
    let err = cast_with(&descriptor, &wrong, &ctx()).expect_err("size is text");
    assert_eq!(err.as_coercion().map(|err| err.path.as_str()), Some("$.kwargs.size"));
}

#[test]
fn inspected_invocation_enforces_required_parameters() {
    let descriptor = Descriptor::inspected_invocation(Descriptor::symbol_path(
        SymbolPathDescriptor::any(),
    ));
    let envelope = Value::map([("fn", Value::text("mod.Gadget"))]);
    let err = cast_with(&descriptor, &envelope, &ctx()).expect_err("size missing");
    assert_eq!(
        reason(&err),
        Some(Mismatch::KeySet {
            missing: vec!["size".into()],
            unknown: vec![],
        })
    );
}

#[test]
fn inspected_invocation_rejects_untyped_parameters() {
    let calls = Arc::new(Mutex::new(0_usize));
    let counter = calls.clone();
    let untyped = Callable::with_signature(
        "Loose",
        Signature::new([Param::typed("a", Descriptor::int()), Param::untyped("b")]),
        move |_, _| {
            *counter.lock() += 1;
            Ok(Value::None)
        },
    );
    let ctx = CastContext::new().with_namespaces(
        NamespaceRegistry::new().with_namespace(Namespace::new("mod").with_callable(untyped)),
    );
    let descriptor = Descriptor::inspected_invocation(Descriptor::symbol_path(
        SymbolPathDescriptor::any(),
    ));
    let envelope = Value::from_json_str(r#"{"fn": "mod.Loose", "kwargs": {"a": 1, "b": 2}}"#)
        .expect("valid json");
    let err = cast_with(&descriptor, &envelope, &ctx).expect_err("b has no type");
    assert!(err.is_config());
    assert!(!err.is_coercion());
    assert_eq!(*calls.lock(), 0);
}

#[test]
fn inspected_invocation_needs_a_signature() {
    let descriptor = Descriptor::inspected_invocation(Descriptor::symbol_path(
        SymbolPathDescriptor::any(),
    ));
    let err = cast_with(&descriptor, &Value::map([("fn", Value::text("mod.Widget"))]), &ctx())
        .expect_err("widget declares no signature");
    assert!(err.is_config());
}

// -----------------------------------------------------------------------------
// Interaction with unions
// -----------------------------------------------------------------------------

#[test]
fn lookup_errors_are_not_swallowed_by_unions() {
    let union = Descriptor::union_of([
        Descriptor::symbol_path(SymbolPathDescriptor::any()),
        Descriptor::text(),
    ]);
    let err = cast_with(&union, &Value::text("nope.thing"), &ctx()).expect_err("lookup error");
    assert!(err.is_lookup());
}

#[test]
fn invocation_without_namespaces_reports_the_root() {
    let descriptor = explicit(SymbolPathDescriptor::any());
    let err = cast(&descriptor, &Value::map([("fn", Value::text("mod.Widget"))]))
        .expect_err("empty registry");
    assert!(matches!(
        err,
        CastError::Lookup(LookupError::UnknownRoot { ref root }) if root == "mod"
    ));
}
