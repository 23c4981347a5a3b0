//! Basic-output error reports: locations, composition, serialization.

use schemir::{Error, Schema, ValidationErrors};
use serde_json::json;

fn validation_errors(schema: serde_json::Value, instance: serde_json::Value) -> ValidationErrors {
    let schema = Schema::from_value(&schema).expect("schema parses");
    match schema.validate(&instance) {
        Err(Error::Validation(errors)) => errors,
        other => panic!("expected validation errors, got {other:?}"),
    }
}

#[test]
fn type_under_properties() {
    let errors = validation_errors(
        json!({"properties": {"name": {"type": "string"}}}),
        json!({"name": 123}),
    );
    assert_eq!(errors.len(), 1);
    let error = errors.iter().next().unwrap();
    assert_eq!(error.keyword_location, "#/properties/name/type");
    assert_eq!(error.instance_location, "#/name");
    assert!(!error.message.is_empty());
    assert!(error.to_string().starts_with("#/properties/name/type: "));
}

#[test]
fn required_missing() {
    let errors = validation_errors(
        json!({
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }),
        json!({}),
    );
    assert_eq!(errors.len(), 1);
    let error = errors.iter().next().unwrap();
    assert_eq!(error.keyword_location, "#/required/name");
    assert_eq!(error.instance_location, "#");
}

#[test]
fn unevaluated_properties_with_combinators() {
    let schema = Schema::from_value(&json!({
        "allOf": [
            {"properties": {"a": {}}},
            {"properties": {"b": {}}}
        ],
        "unevaluatedProperties": false
    }))
    .unwrap();

    assert!(schema.is_valid(&json!({"a": 1, "b": 2})));

    let Err(Error::Validation(errors)) = schema.validate(&json!({"a": 1, "b": 2, "c": 3})) else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.iter().next().unwrap().keyword_location,
        "#/unevaluatedProperties/c"
    );
}

#[test]
fn siblings_keep_reporting_after_a_failure() {
    let errors = validation_errors(
        json!({
            "type": "object",
            "required": ["a", "b"],
            "maxProperties": 1
        }),
        json!({"x": 1, "y": 2}),
    );
    // One error per missing field plus the count violation.
    assert_eq!(errors.len(), 3);
    let locations: Vec<&str> = errors.iter().map(|e| e.keyword_location.as_str()).collect();
    assert!(locations.contains(&"#/required/a"));
    assert!(locations.contains(&"#/required/b"));
    assert!(locations.contains(&"#/maxProperties"));
}

#[test]
fn errors_serialize_in_basic_output_shape() {
    let errors = validation_errors(
        json!({"properties": {"n": {"type": "integer"}}}),
        json!({"n": "x"}),
    );
    let serialized = serde_json::to_value(&errors).unwrap();
    assert_eq!(
        serialized,
        json!([{
            "error": "instance has type \"string\", want \"integer\"",
            "keywordLocation": "#/properties/n/type",
            "instanceLocation": "#/n"
        }])
    );
}

#[test]
fn multiple_errors_render_one_per_line() {
    let errors = validation_errors(json!({"required": ["a", "b"]}), json!({}));
    let rendered = errors.to_string();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("#/required/"));
}

#[test]
fn nested_array_locations() {
    let errors = validation_errors(
        json!({
            "properties": {
                "tags": {"items": {"type": "string"}}
            }
        }),
        json!({"tags": ["ok", 7]}),
    );
    assert_eq!(errors.len(), 1);
    let error = errors.iter().next().unwrap();
    assert_eq!(error.keyword_location, "#/properties/tags/items/type");
    assert_eq!(error.instance_location, "#/tags/1");
}
