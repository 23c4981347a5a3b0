//! End-to-end scenarios: remote loading, dynamic references, defaults,
//! round-trips, and adversarial inputs.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use ahash::AHashMap;
use fluent_uri::UriRef;
use schemir::{Error, Loader, ResolveOpts, Schema, SchemaError, ValidateOpts};
use serde_json::{json, Value};

/// A loader serving schemas from a fixed map, the test double for
/// network retrieval.
struct MapLoader {
    documents: AHashMap<String, Value>,
    loads: AtomicUsize,
}

impl MapLoader {
    fn new(documents: impl IntoIterator<Item = (&'static str, Value)>) -> Arc<MapLoader> {
        Arc::new(MapLoader {
            documents: documents
                .into_iter()
                .map(|(uri, doc)| (uri.to_string(), doc))
                .collect(),
            loads: AtomicUsize::new(0),
        })
    }
}

impl Loader for MapLoader {
    fn load(
        &self,
        schema_id: &str,
        uri: &UriRef<String>,
    ) -> Result<Schema, Box<dyn std::error::Error + Send + Sync>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let document = self
            .documents
            .get(uri.as_str())
            .ok_or_else(|| format!("no such document: {uri}"))?;
        Ok(Schema::parse_unresolved(Some(schema_id), document)?)
    }
}

fn resolve_with(
    schema: Value,
    loader: Arc<MapLoader>,
) -> Result<Schema, SchemaError> {
    let mut schema = Schema::parse_unresolved(None, &schema)?;
    schema.resolve(&ResolveOpts {
        loader: Some(loader),
        ..Default::default()
    })?;
    Ok(schema)
}

#[test]
fn ref_into_remote_document() {
    let loader = MapLoader::new([(
        "https://example.com/x",
        json!({"$defs": {"S": {"type": "number"}}}),
    )]);
    let schema = resolve_with(json!({"$ref": "https://example.com/x#/$defs/S"}), loader).unwrap();

    assert!(schema.is_valid(&json!(3.14)));

    let Err(Error::Validation(errors)) = schema.validate(&json!("x")) else {
        panic!("expected validation errors");
    };
    // The location is stamped by the resolved target.
    assert_eq!(errors.iter().next().unwrap().keyword_location, "#/type");
}

#[test]
fn remote_documents_are_loaded_once() {
    let loader = MapLoader::new([(
        "https://example.com/shared",
        json!({"type": "integer"}),
    )]);
    let schema = resolve_with(
        json!({
            "properties": {
                "a": {"$ref": "https://example.com/shared"},
                "b": {"$ref": "https://example.com/shared"}
            }
        }),
        Arc::clone(&loader),
    )
    .unwrap();
    assert!(schema.is_valid(&json!({"a": 1, "b": 2})));
    assert!(!schema.is_valid(&json!({"a": 1, "b": "x"})));
    assert_eq!(loader.loads.load(Ordering::Relaxed), 1);
}

#[test]
fn dynamic_anchor_overridden_across_documents() {
    // Document A declares the extension point T as a string; document B
    // references A and overrides T with an integer.
    let a = json!({
        "$id": "https://example.com/a",
        "$dynamicRef": "#T",
        "$defs": {
            "default": {"$dynamicAnchor": "T", "type": "string"}
        }
    });
    let b = json!({
        "$id": "https://example.com/b",
        "$ref": "https://example.com/a",
        "$defs": {
            "override": {"$dynamicAnchor": "T", "type": "integer"}
        }
    });

    let loader = MapLoader::new([("https://example.com/a", a.clone())]);
    let through_b = resolve_with(b, loader).unwrap();
    assert!(through_b.is_valid(&json!(7)));
    assert!(!through_b.is_valid(&json!("7")));

    // Without the override the anchor falls back to A's own declaration.
    let a_alone = Schema::from_value(&a).unwrap();
    assert!(a_alone.is_valid(&json!("7")));
    assert!(!a_alone.is_valid(&json!(7)));
}

#[test]
fn defaults_fill_missing_properties() {
    let schema = Schema::from_value(&json!({
        "properties": {"n": {"type": "integer", "default": 5}}
    }))
    .unwrap();

    let opts = ValidateOpts {
        apply_defaults: true,
        validate_format: false,
    };
    let mut instance = json!({});
    schema.validate_with_opts(&mut instance, &opts).unwrap();
    assert_eq!(instance, json!({"n": 5}));

    // A required property must come from the caller: no default, and
    // validation reports it missing.
    let strict = Schema::from_value(&json!({
        "properties": {"n": {"type": "integer", "default": 5}},
        "required": ["n"]
    }))
    .unwrap();
    let mut instance = json!({});
    let result = strict.validate_with_opts(&mut instance, &opts);
    assert_eq!(instance, json!({}));
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn marshalled_schema_validates_identically() {
    let source = json!({
        "$defs": {"name": {"$anchor": "name", "type": "string", "minLength": 1}},
        "type": "object",
        "properties": {"name": {"$ref": "#name"}},
        "required": ["name"],
        "unevaluatedProperties": false
    });
    let schema = Schema::from_value(&source).unwrap();
    let reparsed = Schema::from_value(&schema.to_value()).unwrap();

    for instance in [
        json!({"name": "x"}),
        json!({"name": ""}),
        json!({"name": "x", "extra": 1}),
        json!({}),
        json!(null),
    ] {
        assert_eq!(
            schema.validate(&instance).is_ok(),
            reparsed.validate(&instance).is_ok(),
            "diverged on {instance}"
        );
    }
}

#[test]
fn unknown_keywords_do_not_fail_validation() {
    let schema = Schema::from_value(&json!({
        "x-internal": {"arbitrary": ["stuff"]},
        "type": "integer"
    }))
    .unwrap();
    assert!(schema.is_valid(&json!(3)));
    assert!(!schema.is_valid(&json!("3")));
}

#[test]
fn self_referential_schema_is_caught_by_the_depth_cap() {
    let schema = Schema::from_value(&json!({"$ref": "#"})).unwrap();
    match schema.validate(&json!({"any": "thing"})) {
        Err(Error::Schema(SchemaError::RecursionLimit)) => {}
        other => panic!("expected the recursion limit, got {other:?}"),
    }
}

#[test]
fn recursive_schemas_terminate_on_finite_instances() {
    // A linked list: recursion is bounded by the instance.
    let schema = Schema::from_value(&json!({
        "$defs": {
            "list": {
                "type": "object",
                "properties": {
                    "value": {"type": "integer"},
                    "next": {"$ref": "#/$defs/list"}
                },
                "required": ["value"]
            }
        },
        "$ref": "#/$defs/list"
    }))
    .unwrap();

    assert!(schema.is_valid(&json!({"value": 1, "next": {"value": 2}})));
    assert!(!schema.is_valid(&json!({"value": 1, "next": {"value": "x"}})));
}

#[test]
fn one_off_helpers() {
    assert!(schemir::is_valid(&json!({"minimum": 2}), &json!(3)));
    assert!(!schemir::is_valid(&json!({"minimum": 2}), &json!(1)));
    assert!(schemir::validate(&json!({"type": "array"}), &json!([])).is_ok());
}
