//! Array keywords.
//!
//! `prefixItems`, `items` and `contains` leave notes behind describing
//! which elements they evaluated; `maxContains`/`minContains` and
//! `unevaluatedItems` consume them. The keyword ordering guarantees the
//! producers run first.

use serde_json::Value;

use crate::{
    arg::Arg,
    error::{self, EvalError},
    helpers,
    keywords::arg_mismatch,
    notes::{NoteValue, PrefixNote},
    state::ValidationState,
};

/// Validates one array element against a sub-schema, stamping the
/// element's instance pointer and the keyword prefix onto any failures.
pub(crate) fn validate_element(
    sub: crate::schema::NodeId,
    index: usize,
    value: &Value,
    state: &mut ValidationState<'_>,
    acc: &mut Option<EvalError>,
    prefix: &str,
) {
    let root = state.root;
    state.push_instance_token(&index.to_string());
    if let Err(err) = root.validate_sub_schema(sub, value, state) {
        let err = error::ensure_instance_location(err, &state.instance_pointer());
        error::add_error(acc, err, prefix);
    }
    state.pop_instance_token();
}

pub fn validate_prefix_items(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schemas(schemas) = arg else {
        return Err(arg_mismatch("prefixItems", arg));
    };
    // The note records the full prefix length even when the instance is
    // shorter; items in the same node starts after the prefix.
    state.notes.append_prefix(
        "prefixItems",
        PrefixNote {
            len: schemas.len(),
            node: state.node,
        },
    );

    let Value::Array(items) = instance else {
        return Ok(());
    };

    let mut acc = None;
    for (i, &sub) in schemas.iter().enumerate() {
        if i >= items.len() {
            break;
        }
        validate_element(sub, i, &items[i], state, &mut acc, &format!("prefixItems/{i}"));
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

pub fn validate_items(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("items", arg));
    };
    let Value::Array(items) = instance else {
        return Ok(());
    };

    // Start after the prefix recorded by this node's own prefixItems.
    let mut start = 0;
    if let Some(NoteValue::Prefixes(prefixes)) = state.notes.get("prefixItems") {
        for prefix in prefixes {
            if prefix.node == state.node {
                start = prefix.len;
                break;
            }
        }
    }

    if start < items.len() {
        state.notes.set("items", NoteValue::Flag(true));
    }

    let mut acc = None;
    for (i, item) in items.iter().enumerate().skip(start) {
        validate_element(*sub, i, item, state, &mut acc, "items");
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

pub fn validate_contains(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("contains", arg));
    };
    let Value::Array(items) = instance else {
        return Ok(());
    };

    // A sibling minContains of zero makes "contains" itself vacuous;
    // the matched-index note is still recorded for unevaluatedItems.
    let mut ok = has_min_contains_zero(state);

    let root = state.root;
    let mut matched = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match root.validate_sub_schema(*sub, item, state) {
            Ok(()) => {
                ok = true;
                matched.push(i);
            }
            Err(err) if err.is_validation() => {}
            Err(fatal) => return Err(fatal),
        }
    }

    if !ok {
        return Err(EvalError::fail(
            "no array element matches \"contains\" schema",
        ));
    }
    state.notes.append_indexes("contains", matched);
    Ok(())
}

fn has_min_contains_zero(state: &ValidationState<'_>) -> bool {
    state
        .root
        .parts(state.node)
        .iter()
        .skip(state.index + 1)
        .any(|p| p.keyword.name == "minContains" && p.value.as_int() == Some(0))
}

pub fn validate_max_items(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = arg.as_int().ok_or_else(|| arg_mismatch("maxItems", arg))?;
    if let Value::Array(items) = instance {
        if items.len() as i64 > bound {
            return Err(EvalError::fail(format!(
                "length {} too long for \"maxItems\" argument {bound}",
                items.len()
            )));
        }
    }
    Ok(())
}

pub fn validate_min_items(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = arg.as_int().ok_or_else(|| arg_mismatch("minItems", arg))?;
    if let Value::Array(items) = instance {
        if (items.len() as i64) < bound {
            return Err(EvalError::fail(format!(
                "length {} too short for \"minItems\" argument {bound}",
                items.len()
            )));
        }
    }
    Ok(())
}

pub fn validate_unique_items(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Bool(required) = arg else {
        return Err(arg_mismatch("uniqueItems", arg));
    };
    if !*required {
        return Ok(());
    }
    if let Value::Array(items) = instance {
        if !helpers::is_unique(items) {
            return Err(EvalError::fail(
                "\"uniqueItems\" failure: an element appears more than once",
            ));
        }
    }
    Ok(())
}

fn contains_count(state: &ValidationState<'_>) -> Option<usize> {
    match state.notes.get("contains") {
        Some(NoteValue::Indexes(matched)) => Some(matched.len()),
        _ => None,
    }
}

pub fn validate_max_contains(
    arg: &Arg,
    _instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = arg.as_int().ok_or_else(|| arg_mismatch("maxContains", arg))?;
    if let Some(count) = contains_count(state) {
        if count as i64 > bound {
            return Err(EvalError::fail(format!(
                "{count} matches is more than \"maxContains\" requirement {bound}"
            )));
        }
    }
    Ok(())
}

pub fn validate_min_contains(
    arg: &Arg,
    _instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = arg.as_int().ok_or_else(|| arg_mismatch("minContains", arg))?;
    if let Some(count) = contains_count(state) {
        if (count as i64) < bound {
            return Err(EvalError::fail(format!(
                "{count} matches is less than \"minContains\" requirement {bound}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn prefix_items_then_items() {
        let schema = Schema::from_value(&json!({
            "prefixItems": [{"type": "string"}],
            "items": {"type": "integer"}
        }))
        .unwrap();
        assert!(schema.is_valid(&json!(["a", 1, 2])));
        assert!(!schema.is_valid(&json!(["a", 1, "b"])));
        assert!(!schema.is_valid(&json!([1])));
        assert!(schema.is_valid(&json!([])));
    }

    #[test]
    fn items_error_locations() {
        let schema = Schema::from_value(&json!({
            "prefixItems": [{"type": "string"}],
            "items": {"type": "integer"}
        }))
        .unwrap();
        let err = schema.validate(&json!(["a", "b"])).unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        let error = errors.iter().next().unwrap();
        assert_eq!(error.keyword_location, "#/items/type");
        assert_eq!(error.instance_location, "#/1");
    }

    #[test_case(json!({"contains": {"type": "integer"}}), json!(["a", 3]), true)]
    #[test_case(json!({"contains": {"type": "integer"}}), json!(["a", "b"]), false)]
    #[test_case(json!({"contains": {"type": "integer"}, "minContains": 0}), json!(["a"]), true; "min contains zero is vacuous")]
    #[test_case(json!({"contains": {"type": "integer"}, "minContains": 2}), json!([1, "a", 2]), true)]
    #[test_case(json!({"contains": {"type": "integer"}, "minContains": 2}), json!([1, "a"]), false)]
    #[test_case(json!({"contains": {"type": "integer"}, "maxContains": 1}), json!([1, 2]), false)]
    fn contains_family(schema: serde_json::Value, instance: serde_json::Value, valid: bool) {
        let schema = Schema::from_value(&schema).unwrap();
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test]
    fn unique_items_value_equality() {
        let schema = Schema::from_value(&json!({"uniqueItems": true})).unwrap();
        assert!(!schema.is_valid(&json!([1, 1.0])));
        assert!(schema.is_valid(&json!([1, 2, "1"])));
    }

    #[test]
    fn item_counts() {
        let schema = Schema::from_value(&json!({"minItems": 1, "maxItems": 2})).unwrap();
        assert!(!schema.is_valid(&json!([])));
        assert!(schema.is_valid(&json!([1])));
        assert!(!schema.is_valid(&json!([1, 2, 3])));
    }
}
