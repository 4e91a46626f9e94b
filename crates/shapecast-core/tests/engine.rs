//! End-to-end scenarios exercising the public surface: composition,
//! validation, codec directions, recursion and error reporting
//! together, the way a consumer of the crate uses them.

use shapecast_core::{Codec, Schema, Value};

fn package_schema() -> Schema {
    Schema::record([
        ("version", Schema::literal(1)),
        ("size", Schema::number()),
    ])
}

#[test]
fn record_validation_locates_the_bad_field() {
    let schema = package_schema();

    let ok = Value::object([("version", Value::from(1)), ("size", Value::from(100))]);
    assert!(schema.guard(&ok));

    let bad = Value::object([("version", Value::from(1)), ("size", Value::from("big"))]);
    let failure = schema.validate(&bad).unwrap_err();
    assert_eq!(failure.message, "Expected number, but was string");
    assert_eq!(failure.key.as_deref(), Some("size"));
}

#[test]
fn check_raises_a_displayable_error() {
    let schema = package_schema();
    let bad = Value::object([("version", Value::from(2)), ("size", Value::from(10))]);

    let err = schema.check(&bad).unwrap_err();
    assert_eq!(err.message(), "Expected literal 1, but was 2");
    assert_eq!(err.key(), Some("version"));
    // Display renders the full tree when one exists.
    let rendered = err.to_string();
    assert!(rendered.starts_with("Unable to assign"));
    assert!(rendered.contains("The types of \"version\" are not compatible"));
    assert!(rendered.contains("Expected literal 1, but was 2"));
}

#[test]
fn failures_serialize_for_api_payloads() {
    let failure = package_schema()
        .validate(&Value::object([
            ("version", Value::from(1)),
            ("size", Value::from("big")),
        ]))
        .unwrap_err();
    let json = serde_json::to_value(&failure).unwrap();
    assert_eq!(json["message"], "Expected number, but was string");
    assert_eq!(json["key"], "size");
    assert!(json["full_error"]["title"].is_string());
}

#[test]
fn cyclic_values_validate_against_recursive_schemas() {
    // v satisfies v[1] == v.
    let v = Value::array([Value::from(0), Value::Null]);
    v.as_array().unwrap().borrow_mut()[1] = v.clone();

    let schema = Schema::recursive(|this| {
        Schema::array(Schema::union([Schema::number(), this]))
    });
    assert!(schema.guard(&v));
    assert!(schema.validate(&v).is_ok());
}

#[test]
fn discriminated_unions_dispatch_on_the_tag() {
    let circle = Schema::record([
        ("kind", Schema::literal("circle")),
        ("radius", Schema::number()),
    ]);
    let square = Schema::record([
        ("kind", Schema::literal("square")),
        ("x", Schema::number()),
    ]);
    let shape = Schema::union([circle, square]);

    assert!(shape.guard(&Value::object([
        ("kind", Value::from("circle")),
        ("radius", Value::from(2)),
    ])));

    // Dispatch gives the precise nested key.
    let failure = shape
        .validate(&Value::object([
            ("kind", Value::from("square")),
            ("x", Value::from("wide")),
        ]))
        .unwrap_err();
    assert_eq!(failure.key.as_deref(), Some("x"));

    // An unknown tag falls back to the generic, keyless union failure.
    let failure = shape
        .validate(&Value::object([("kind", Value::from("triangle"))]))
        .unwrap_err();
    assert_eq!(failure.key, None);
}

#[test]
fn dictionaries_keyed_by_number_coerce_string_keys() {
    let schema = Schema::dictionary(Schema::number(), Schema::string()).unwrap();

    assert!(schema.guard(&Value::object([("3.14", Value::from("pi"))])));
    let failure = schema
        .validate(&Value::object([("foo", Value::from("x"))]))
        .unwrap_err();
    assert_eq!(
        failure.message,
        "Expected dictionary key to be a number, but was 'foo'"
    );
}

#[test]
fn codec_round_trips_canonical_raw_values() {
    // Raw: an ISO-ish "<major>.<minor>" string; parsed: a record.
    let version = Schema::parsed(
        Schema::string(),
        Codec::new(|v| {
            let Value::String(s) = v else {
                return Err("expected a string".to_string());
            };
            let (major, minor) = s
                .split_once('.')
                .ok_or_else(|| format!("expected '<major>.<minor>', got {s:?}"))?;
            let major: f64 = major.parse().map_err(|_| "major is not a number".to_string())?;
            let minor: f64 = minor.parse().map_err(|_| "minor is not a number".to_string())?;
            Ok(Value::object([
                ("major", Value::from(major)),
                ("minor", Value::from(minor)),
            ]))
        })
        .named("Version")
        .with_serialize(|v| {
            let entries = v.as_object().ok_or("expected an object")?.borrow().clone();
            match (entries.get("major"), entries.get("minor")) {
                (Some(Value::Number(major)), Some(Value::Number(minor))) => {
                    Ok(Value::from(format!("{major}.{minor}")))
                }
                _ => Err("expected major/minor numbers".to_string()),
            }
        })
        .with_test(Schema::record([
            ("major", Schema::number()),
            ("minor", Schema::number()),
        ])),
    );

    let raw = Value::from("1.75");
    let parsed = version.parse(&raw).unwrap();
    assert_eq!(
        parsed,
        Value::object([("major", Value::from(1)), ("minor", Value::from(75))])
    );
    assert_eq!(version.serialize(&parsed).unwrap(), raw);

    // `check` tests the parsed representation, not the raw one.
    assert!(version.guard(&parsed));
    assert!(!version.guard(&raw));

    let failure = version.parse(&Value::from("oops")).unwrap_err();
    assert_eq!(failure.message, "expected '<major>.<minor>', got \"oops\"");
}

#[test]
fn refined_records_compose_with_the_rest_of_the_engine() {
    let crew = Schema::record([
        ("name", Schema::string()),
        ("rank", Schema::string()),
        ("age", Schema::number()),
    ]);

    let roster = Schema::array(crew.pick(&["name", "age"]).unwrap().as_partial().unwrap());
    assert!(roster.guard(&Value::array([
        Value::object([("name", Value::from("ada"))]),
        Value::object([("age", Value::from(36))]),
    ])));

    let failure = roster
        .validate(&Value::array([Value::object([("age", Value::from("old"))])]))
        .unwrap_err();
    assert_eq!(failure.key.as_deref(), Some("[0].age"));
}

#[test]
fn branded_and_constrained_schemas_nest() {
    let port = Schema::number()
        .with_guard_named("Port", |v| {
            matches!(v, Value::Number(n) if (1.0..=65535.0).contains(n) && n.fract() == 0.0)
        })
        .with_brand("Port");
    let endpoint = Schema::record([("host", Schema::string()), ("port", port)]);

    assert!(endpoint.guard(&Value::object([
        ("host", Value::from("localhost")),
        ("port", Value::from(8080)),
    ])));

    let failure = endpoint
        .validate(&Value::object([
            ("host", Value::from("localhost")),
            ("port", Value::from(70000)),
        ]))
        .unwrap_err();
    assert_eq!(failure.message, "Failed Port check");
    assert_eq!(failure.key.as_deref(), Some("port"));
}

#[test]
fn json_bridge_feeds_the_engine() {
    let schema = Schema::record([
        ("name", Schema::string()),
        ("tags", Schema::array(Schema::string())),
    ]);
    let json: serde_json::Value =
        serde_json::from_str(r#"{"name":"ada","tags":["math","engine"]}"#).unwrap();
    let validated = schema.validate(&Value::from(json.clone())).unwrap();
    assert_eq!(validated.to_json().unwrap(), json);
}
