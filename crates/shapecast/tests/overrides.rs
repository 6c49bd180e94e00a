use shapecast::{
    Descriptor, OverrideError, RecordDescriptor, RecordValue, Value, apply_overrides, cast,
    parse_override,
};

fn server() -> Descriptor {
    let tls = RecordDescriptor::builder("Tls")
        .field_with_default("enabled", Descriptor::bool(), Value::Bool(false))
        .field_with_default("cert", Descriptor::optional(Descriptor::text()), Value::None)
        .build();
    RecordDescriptor::builder("Server")
        .field("host", Descriptor::text())
        .field_with_default("port", Descriptor::int(), Value::Int(8080))
        .field_with_default("tls", tls, Value::record(RecordValue::new("Tls")))
        .build()
}

#[test]
fn overrides_build_input_for_a_cast() {
    let mut input = Value::from_json_str(r#"{"host": "localhost"}"#).expect("valid json");
    apply_overrides(
        &mut input,
        ["port=9000", "tls.enabled=True", r#"tls.cert="/etc/cert.pem""#],
    )
    .expect("overrides apply");

    let coerced = cast(&server(), &input).expect("valid server");
    let record = coerced.as_record().expect("record");
    assert_eq!(record.get("port"), Some(&Value::Int(9000)));
    assert_eq!(
        record.get("tls"),
        Some(&Value::record(
            RecordValue::new("Tls")
                .with_field("enabled", Value::Bool(true))
                .with_field("cert", Value::text("/etc/cert.pem")),
        ))
    );
}

#[test]
fn later_overrides_win_and_replace_structures() {
    let mut input = Value::empty_map();
    apply_overrides(&mut input, ["a.b=1", "a.b=[1, 2]", r#"a.c={"d": null}"#])
        .expect("overrides apply");
    assert_eq!(
        input,
        Value::map([(
            "a",
            Value::map([
                ("b", Value::list([Value::Int(1), Value::Int(2)])),
                ("c", Value::map([("d", Value::None)])),
            ]),
        )])
    );
}

#[test]
fn assigning_through_a_scalar_fails() {
    let mut input = Value::map([("a", Value::Int(1))]);
    let err = apply_overrides(&mut input, ["a.b=2"]).expect_err("a is an int");
    assert!(matches!(err, OverrideError::NotAMap { ref path } if path == "$.a"));
}

#[test]
fn nothing_is_applied_when_any_override_is_malformed() {
    let mut input = Value::empty_map();
    let err = apply_overrides(&mut input, ["a=1", "b"]).expect_err("b has no value");
    assert!(matches!(err, OverrideError::MissingAssignment { .. }));
    assert_eq!(input, Value::empty_map());
}

#[test]
fn parsed_overrides_expose_keys_and_value() {
    let parsed = parse_override(" x.y = 1.5 ").expect("valid");
    assert_eq!(parsed.keys, vec!["x", "y"]);
    assert_eq!(parsed.value, Value::Float(1.5));
}
