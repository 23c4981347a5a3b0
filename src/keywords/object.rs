//! Object keywords.
//!
//! `properties`, `patternProperties` and `additionalProperties` record a
//! note for every instance field they evaluate; `additionalProperties`
//! and `unevaluatedProperties` read those notes to find what is left.

use ahash::AHashSet;
use serde_json::Value;

use crate::{
    arg::{Arg, ArrayOrSchema},
    error::{self, EvalError, SchemaError},
    helpers::compiled_regex,
    keywords::arg_mismatch,
    notes::{Notes, NoteValue, PropertyNote},
    state::ValidationState,
};

pub fn validate_properties(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::MapSchema(map) = arg else {
        return Err(arg_mismatch("properties", arg));
    };
    let Value::Object(fields) = instance else {
        return Ok(());
    };

    let root = state.root;
    let mut acc = None;
    for (name, &sub) in map {
        let Some(value) = fields.get(name) else {
            continue;
        };
        state.push_instance_token(name);
        if let Err(err) = root.validate_sub_schema(sub, value, state) {
            let err = error::ensure_instance_location(err, &state.instance_pointer());
            error::add_error(
                &mut acc,
                err,
                &format!("properties/{}", error::escape_token(name)),
            );
        }
        state.pop_instance_token();

        state.notes.append_property(
            "properties",
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

pub fn validate_pattern_properties(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::MapSchema(map) = arg else {
        return Err(arg_mismatch("patternProperties", arg));
    };
    let Value::Object(fields) = instance else {
        return Ok(());
    };

    let mut compiled = Vec::with_capacity(map.len());
    for (pattern, &sub) in map {
        compiled.push((compiled_regex(pattern)?, sub));
    }

    let root = state.root;
    let mut acc = None;
    for (name, value) in fields {
        for (re, sub) in &compiled {
            let matched = re.find(name).map_err(|e| SchemaError::Malformed {
                reason: format!("\"patternProperties\" regexp failed: {e}"),
            })?;
            if matched.is_none() {
                continue;
            }
            state.push_instance_token(name);
            if let Err(err) = root.validate_sub_schema(*sub, value, state) {
                let err = error::ensure_instance_location(err, &state.instance_pointer());
                error::add_error(
                    &mut acc,
                    err,
                    &format!("patternProperties/{}", error::escape_token(name)),
                );
            }
            state.pop_instance_token();

            state.notes.append_property(
                "patternProperties",
                PropertyNote {
                    field: name.clone(),
                    node: state.node,
                },
            );
        }
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

/// Fields already covered by the given note names, optionally limited
/// to notes recorded by this node.
pub(crate) fn covered(
    state: &ValidationState<'_>,
    keys: &[&str],
    same_node: bool,
) -> AHashSet<String> {
    let mut found = AHashSet::new();
    for key in keys {
        if let Some(NoteValue::Properties(notes)) = state.notes.get(key) {
            for note in notes {
                if !same_node || note.node == state.node {
                    found.insert(note.field.clone());
                }
            }
        }
    }
    found
}

pub fn validate_additional_properties(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("additionalProperties", arg));
    };
    let Value::Object(fields) = instance else {
        return Ok(());
    };

    let found = covered(state, &["properties", "patternProperties"], true);

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
                &format!("additionalProperties/{}", error::escape_token(name)),
            );
        }
        state.pop_instance_token();

        state.notes.append_property(
            "additionalProperties",
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

pub fn validate_property_names(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("propertyNames", arg));
    };
    let Value::Object(fields) = instance else {
        return Ok(());
    };

    let root = state.root;
    let mut acc = None;
    for name in fields.keys() {
        let as_value = Value::String(name.clone());
        if let Err(err) = root.validate_sub_schema(*sub, &as_value, state) {
            error::add_error(
                &mut acc,
                err,
                &format!("propertyNames/{}", error::escape_token(name)),
            );
        }
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

pub fn validate_required(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Strings(names) = arg else {
        return Err(arg_mismatch("required", arg));
    };
    let Value::Object(fields) = instance else {
        return Ok(());
    };

    let mut acc = None;
    for name in names {
        if !fields.contains_key(name) {
            error::add_error(
                &mut acc,
                EvalError::fail(format!("missing required field {name:?}")),
                &format!("required/{}", error::escape_token(name)),
            );
        }
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

pub fn validate_dependent_required(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Any(Value::Object(map)) = arg else {
        return Err(EvalError::Fatal(SchemaError::Malformed {
            reason: "\"dependentRequired\" argument must be an object".to_string(),
        }));
    };
    let Value::Object(fields) = instance else {
        return Ok(());
    };

    for (trigger, wanted) in map {
        if !fields.contains_key(trigger) {
            continue;
        }
        let Value::Array(wanted) = wanted else {
            return Err(EvalError::Fatal(SchemaError::Malformed {
                reason: format!("\"dependentRequired\" element {trigger:?} must be an array"),
            }));
        };
        for name in wanted {
            let Value::String(name) = name else {
                return Err(EvalError::Fatal(SchemaError::Malformed {
                    reason: format!(
                        "\"dependentRequired\" element {trigger:?} must contain strings"
                    ),
                }));
            };
            if !fields.contains_key(name) {
                return Err(EvalError::fail(format!(
                    "\"dependentRequired\" failure: have field {trigger:?} but not field {name:?}"
                )));
            }
        }
    }
    Ok(())
}

pub fn validate_dependent_schemas(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::MapSchema(map) = arg else {
        return Err(arg_mismatch("dependentSchemas", arg));
    };
    let Value::Object(fields) = instance else {
        return Ok(());
    };

    let root = state.root;
    let mut sub_state = state.child()?;
    let mut keep: Vec<Notes> = Vec::new();
    let mut acc = None;
    for (name, &sub) in map {
        if !fields.contains_key(name) {
            continue;
        }
        match root.validate_in_place(sub, instance, &mut sub_state) {
            Err(err) => error::add_error(
                &mut acc,
                err,
                &format!("dependentSchemas/{}", error::escape_token(name)),
            ),
            Ok(()) => {
                if !sub_state.notes.is_empty() {
                    keep.push(sub_state.notes.clone());
                }
            }
        }
        sub_state.notes.clear();
    }

    match acc {
        None => {
            state.notes.add_notes(keep);
            Ok(())
        }
        Some(err) => Err(err),
    }
}

fn field_count(instance: &Value) -> Option<usize> {
    match instance {
        Value::Object(fields) => Some(fields.len()),
        _ => None,
    }
}

pub fn validate_max_properties(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = arg
        .as_int()
        .ok_or_else(|| arg_mismatch("maxProperties", arg))?;
    match field_count(instance) {
        Some(count) if count as i64 > bound => Err(EvalError::fail(format!(
            "number of properties {count} is more than \"maxProperties\" limit {bound}"
        ))),
        _ => Ok(()),
    }
}

pub fn validate_min_properties(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = arg
        .as_int()
        .ok_or_else(|| arg_mismatch("minProperties", arg))?;
    match field_count(instance) {
        Some(count) if (count as i64) < bound => Err(EvalError::fail(format!(
            "number of properties {count} is less than \"minProperties\" limit {bound}"
        ))),
        _ => Ok(()),
    }
}

/// The draft 7 `dependencies` keyword: per trigger field, either a list
/// of required names or a schema for the whole instance.
pub fn validate_dependencies(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::MapArrayOrSchema(map) = arg else {
        return Err(arg_mismatch("dependencies", arg));
    };
    let Value::Object(fields) = instance else {
        return Ok(());
    };

    let root = state.root;
    let mut sub_state = state.child()?;
    let mut keep: Vec<Notes> = Vec::new();
    let mut acc = None;
    for (name, dependency) in map {
        if !fields.contains_key(name) {
            continue;
        }
        match dependency {
            ArrayOrSchema::Schema(sub) => {
                match root.validate_in_place(*sub, instance, &mut sub_state) {
                    Err(err) => error::add_error(
                        &mut acc,
                        err,
                        &format!("dependencies/{}", error::escape_token(name)),
                    ),
                    Ok(()) => {
                        if !sub_state.notes.is_empty() {
                            keep.push(sub_state.notes.clone());
                        }
                    }
                }
                sub_state.notes.clear();
            }
            ArrayOrSchema::Array(wanted) => {
                for required in wanted {
                    if !fields.contains_key(required) {
                        return Err(EvalError::fail(format!(
                            "\"dependencies\" failure: have field {name:?} but not field {required:?}"
                        )));
                    }
                }
            }
        }
    }

    match acc {
        None => {
            state.notes.add_notes(keep);
            Ok(())
        }
        Some(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn properties_stamp_locations() {
        let schema = Schema::from_value(&json!({
            "properties": {"name": {"type": "string"}}
        }))
        .unwrap();
        let err = schema.validate(&json!({"name": 123})).unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.keyword_location, "#/properties/name/type");
        assert_eq!(error.instance_location, "#/name");
    }

    #[test]
    fn required_reports_each_missing_field() {
        let schema = Schema::from_value(&json!({
            "required": ["a", "b"]
        }))
        .unwrap();
        let err = schema.validate(&json!({"b": 1})).unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.keyword_location, "#/required/a");
        assert_eq!(error.instance_location, "#");
    }

    #[test_case(json!({"x_1": 1}), true)]
    #[test_case(json!({"x_1": "s"}), false)]
    #[test_case(json!({"other": "s"}), true; "unmatched names are free")]
    fn pattern_properties(instance: serde_json::Value, valid: bool) {
        let schema = Schema::from_value(&json!({
            "patternProperties": {"^x_": {"type": "integer"}}
        }))
        .unwrap();
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test]
    fn additional_properties_sees_siblings() {
        let schema = Schema::from_value(&json!({
            "properties": {"a": {}},
            "patternProperties": {"^p": {}},
            "additionalProperties": false
        }))
        .unwrap();
        assert!(schema.is_valid(&json!({"a": 1, "p1": 2})));
        assert!(!schema.is_valid(&json!({"a": 1, "z": 2})));
    }

    #[test]
    fn property_names_validates_each_name() {
        let schema = Schema::from_value(&json!({
            "propertyNames": {"maxLength": 3}
        }))
        .unwrap();
        assert!(schema.is_valid(&json!({"abc": 1})));
        assert!(!schema.is_valid(&json!({"abcd": 1})));
    }

    #[test]
    fn dependent_keywords() {
        let schema = Schema::from_value(&json!({
            "dependentRequired": {"credit_card": ["billing_address"]},
            "dependentSchemas": {"name": {"required": ["first"]}}
        }))
        .unwrap();
        assert!(schema.is_valid(&json!({})));
        assert!(!schema.is_valid(&json!({"credit_card": "4111"})));
        assert!(schema.is_valid(&json!({"credit_card": "4111", "billing_address": "x"})));
        assert!(!schema.is_valid(&json!({"name": "n"})));
        assert!(schema.is_valid(&json!({"name": "n", "first": "f"})));
    }

    #[test]
    fn property_counts() {
        let schema = Schema::from_value(&json!({"minProperties": 1, "maxProperties": 2})).unwrap();
        assert!(!schema.is_valid(&json!({})));
        assert!(schema.is_valid(&json!({"a": 1})));
        assert!(!schema.is_valid(&json!({"a": 1, "b": 2, "c": 3})));
    }
}
