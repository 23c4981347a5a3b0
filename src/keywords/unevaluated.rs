//! `unevaluatedItems` and `unevaluatedProperties`.
//!
//! These read the notes of everything that ran before them, including
//! notes merged in from `$ref` targets and passing combinator branches,
//! and validate whatever is left. Their `after` constraints in the
//! vocabulary make them the last keywords of their node.

use serde_json::Value;

use crate::{
    arg::Arg,
    error::{self, EvalError},
    keywords::{arg_mismatch, array::validate_element, object::covered},
    notes::{NoteValue, PropertyNote},
    state::ValidationState,
};

pub fn validate_unevaluated_items(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("unevaluatedItems", arg));
    };

    // `items` or a previous `unevaluatedItems` already covered the tail.
    if state.notes.flag("items") == Some(true)
        || state.notes.flag("unevaluatedItems") == Some(true)
    {
        return Ok(());
    }

    let mut start = 0;
    if let Some(NoteValue::Prefixes(prefixes)) = state.notes.get("prefixItems") {
        // Prefix coverage from every in-place branch counts.
        for prefix in prefixes {
            start = start.max(prefix.len);
        }
    }
    let contained: Vec<usize> = match state.notes.get("contains") {
        Some(NoteValue::Indexes(matched)) => matched.clone(),
        _ => Vec::new(),
    };

    let Value::Array(items) = instance else {
        return Ok(());
    };

    if start < items.len() {
        state.notes.set("unevaluatedItems", NoteValue::Flag(true));
    }

    let mut acc = None;
    for (i, item) in items.iter().enumerate().skip(start) {
        if contained.contains(&i) {
            continue;
        }
        validate_element(*sub, i, item, state, &mut acc, "unevaluatedItems");
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

pub fn validate_unevaluated_properties(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("unevaluatedProperties", arg));
    };

    // Everything any object keyword evaluated, in this node or merged in
    // from in-place evaluation of other nodes.
    let found = covered(
        state,
        &[
            "properties",
            "patternProperties",
            "additionalProperties",
            "unevaluatedProperties",
        ],
        false,
    );

    let Value::Object(fields) = instance else {
        return Ok(());
    };

    let root = state.root;
    let mut acc = None;
    for (name, value) in fields {
        if found.contains(name) {
            continue;
        }
        state.push_instance_token(name);
        if let Err(err) = root.validate_sub_schema(*sub, value, state) {
            let err = error::ensure_instance_location(err, &state.instance_pointer());
            error::add_error(
                &mut acc,
                err,
                &format!("unevaluatedProperties/{}", error::escape_token(name)),
            );
        }
        state.pop_instance_token();

        state.notes.append_property(
            "unevaluatedProperties",
            PropertyNote {
                field: name.clone(),
                node: state.node,
            },
        );
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn sees_properties_from_all_of_branches() {
        let schema = Schema::from_value(&json!({
            "allOf": [
                {"properties": {"a": {}}},
                {"properties": {"b": {}}}
            ],
            "unevaluatedProperties": false
        }))
        .unwrap();
        assert!(schema.is_valid(&json!({"a": 1, "b": 2})));

        let err = schema.validate(&json!({"a": 1, "b": 2, "c": 3})).unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        let error = errors.iter().next().unwrap();
        assert_eq!(error.keyword_location, "#/unevaluatedProperties/c");
    }

    #[test]
    fn sees_properties_through_refs() {
        let schema = Schema::from_value(&json!({
            "$defs": {"base": {"properties": {"a": {}}}},
            "$ref": "#/$defs/base",
            "unevaluatedProperties": false
        }))
        .unwrap();
        assert!(schema.is_valid(&json!({"a": 1})));
        assert!(!schema.is_valid(&json!({"b": 1})));
    }

    #[test_case(json!(["a", 1]), true)]
    #[test_case(json!(["a", 1, true]), false)]
    fn unevaluated_items_after_prefix(instance: serde_json::Value, valid: bool) {
        let schema = Schema::from_value(&json!({
            "prefixItems": [{"type": "string"}, {"type": "integer"}],
            "unevaluatedItems": false
        }))
        .unwrap();
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test]
    fn contains_matches_stay_evaluated() {
        let schema = Schema::from_value(&json!({
            "contains": {"type": "integer"},
            "unevaluatedItems": {"type": "string"}
        }))
        .unwrap();
        assert!(schema.is_valid(&json!([1, "a", 2])));
        assert!(!schema.is_valid(&json!([1, true])));
    }

    #[test]
    fn items_covers_the_tail() {
        let schema = Schema::from_value(&json!({
            "items": {"type": "integer"},
            "unevaluatedItems": false
        }))
        .unwrap();
        assert!(schema.is_valid(&json!([1, 2])));
    }
}
