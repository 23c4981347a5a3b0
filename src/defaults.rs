//! Opt-in application of `default` values.
//!
//! Runs as a pass over schema and instance together, before validation,
//! writing defaults into the instance: a missing object property whose
//! `properties` sub-schema has a `default` is inserted (unless listed in
//! `required`, since the caller must supply those), and a `null` array
//! slot covered by `prefixItems` or a pre-2020 `items` list is replaced.
//! The pass descends through the applicators that evaluate the same
//! instance in place, including resolved references, so defaults inside
//! combinator branches and referenced schemas are honoured. Whether the
//! defaulted instance then validates is up to the normal validation run
//! that follows.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    arg::{Arg, SchemaOrSchemas},
    error::SchemaError,
    resolver::{RESOLVED_DYNAMIC_REF, RESOLVED_REF},
    schema::{NodeId, Schema},
    state::MAX_DEPTH,
};

pub(crate) fn apply_defaults(schema: &Schema, instance: &mut Value) -> Result<(), SchemaError> {
    apply(schema, schema.root(), instance, 0)
}

fn default_of(schema: &Schema, node: NodeId) -> Option<&Value> {
    match schema.lookup_keyword(node, "default") {
        Some(Arg::Any(value)) => Some(value),
        _ => None,
    }
}

fn required_names(schema: &Schema, node: NodeId) -> &[String] {
    match schema.lookup_keyword(node, "required") {
        Some(Arg::Strings(names)) => names,
        _ => &[],
    }
}

fn apply(
    schema: &Schema,
    node: NodeId,
    instance: &mut Value,
    depth: u32,
) -> Result<(), SchemaError> {
    if depth > MAX_DEPTH {
        return Err(SchemaError::RecursionLimit);
    }
    let depth = depth + 1;

    for part in schema.parts(node) {
        if part.keyword.generated {
            if Arc::ptr_eq(&part.keyword, &RESOLVED_REF)
                || Arc::ptr_eq(&part.keyword, &RESOLVED_DYNAMIC_REF)
            {
                if let Arg::Schema(target) = part.value {
                    apply(schema, target, instance, depth)?;
                }
            }
            continue;
        }

        match (part.keyword.name.as_str(), &part.value) {
            ("allOf" | "anyOf" | "oneOf", Arg::Schemas(branches)) => {
                for &branch in branches {
                    apply(schema, branch, instance, depth)?;
                }
            }

            ("if" | "then" | "else", Arg::Schema(sub)) => {
                apply(schema, *sub, instance, depth)?;
            }

            ("dependentSchemas", Arg::MapSchema(map)) => {
                let present: Vec<NodeId> = match &*instance {
                    Value::Object(fields) => map
                        .iter()
                        .filter(|(name, _)| fields.contains_key(*name))
                        .map(|(_, &sub)| sub)
                        .collect(),
                    _ => Vec::new(),
                };
                for sub in present {
                    apply(schema, sub, instance, depth)?;
                }
            }

            ("properties", Arg::MapSchema(map)) => {
                let Value::Object(fields) = instance else {
                    continue;
                };
                let required = required_names(schema, node);
                for (name, &sub) in map {
                    if !fields.contains_key(name) && !required.contains(name) {
                        if let Some(default) = default_of(schema, sub) {
                            fields.insert(name.clone(), default.clone());
                        }
                    }
                    if let Some(child) = fields.get_mut(name) {
                        apply(schema, sub, child, depth)?;
                    }
                }
            }

            ("prefixItems", Arg::Schemas(subs)) => {
                let Value::Array(items) = instance else {
                    continue;
                };
                for (i, &sub) in subs.iter().enumerate() {
                    let Some(slot) = items.get_mut(i) else {
                        break;
                    };
                    if slot.is_null() {
                        if let Some(default) = default_of(schema, sub) {
                            *slot = default.clone();
                        }
                    }
                    apply(schema, sub, slot, depth)?;
                }
            }

            ("items", Arg::Schema(sub)) => {
                let start = match schema.lookup_keyword(node, "prefixItems") {
                    Some(Arg::Schemas(prefix)) => prefix.len(),
                    _ => 0,
                };
                let Value::Array(items) = instance else {
                    continue;
                };
                for slot in items.iter_mut().skip(start) {
                    apply(schema, *sub, slot, depth)?;
                }
            }

            // Pre-2020 items: the list form fills null slots like
            // prefixItems, the single form just descends.
            ("items", Arg::SchemaOrSchemas(SchemaOrSchemas::Many(subs))) => {
                let Value::Array(items) = instance else {
                    continue;
                };
                for (i, &sub) in subs.iter().enumerate() {
                    let Some(slot) = items.get_mut(i) else {
                        break;
                    };
                    if slot.is_null() {
                        if let Some(default) = default_of(schema, sub) {
                            *slot = default.clone();
                        }
                    }
                    apply(schema, sub, slot, depth)?;
                }
            }
            ("items", Arg::SchemaOrSchemas(SchemaOrSchemas::One(sub))) => {
                let Value::Array(items) = instance else {
                    continue;
                };
                for slot in items.iter_mut() {
                    apply(schema, *sub, slot, depth)?;
                }
            }

            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Schema, ValidateOpts};
    use serde_json::json;

    fn opts() -> ValidateOpts {
        ValidateOpts {
            apply_defaults: true,
            validate_format: false,
        }
    }

    #[test]
    fn missing_property_gets_its_default() {
        let schema = Schema::from_value(&json!({
            "properties": {"n": {"type": "integer", "default": 5}}
        }))
        .unwrap();
        let mut instance = json!({});
        schema.validate_with_opts(&mut instance, &opts()).unwrap();
        assert_eq!(instance, json!({"n": 5}));
    }

    #[test]
    fn required_properties_get_no_default() {
        let schema = Schema::from_value(&json!({
            "properties": {"n": {"type": "integer", "default": 5}},
            "required": ["n"]
        }))
        .unwrap();
        let mut instance = json!({});
        let err = schema.validate_with_opts(&mut instance, &opts());
        assert_eq!(instance, json!({}));
        assert!(err.is_err());
    }

    #[test]
    fn defaults_apply_through_refs_and_branches() {
        let schema = Schema::from_value(&json!({
            "$defs": {"base": {"properties": {"a": {"default": 1}}}},
            "$ref": "#/$defs/base",
            "allOf": [{"properties": {"b": {"default": 2}}}]
        }))
        .unwrap();
        let mut instance = json!({});
        schema.validate_with_opts(&mut instance, &opts()).unwrap();
        assert_eq!(instance, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn null_prefix_slots_are_filled() {
        let schema = Schema::from_value(&json!({
            "prefixItems": [{"default": "x"}, {"default": "y"}]
        }))
        .unwrap();
        let mut instance = json!([null, "keep"]);
        schema.validate_with_opts(&mut instance, &opts()).unwrap();
        assert_eq!(instance, json!(["x", "keep"]));
    }

    #[test]
    fn nested_defaults_fill_recursively() {
        let schema = Schema::from_value(&json!({
            "properties": {
                "outer": {
                    "default": {},
                    "properties": {"inner": {"default": 7}}
                }
            }
        }))
        .unwrap();
        let mut instance = json!({});
        schema.validate_with_opts(&mut instance, &opts()).unwrap();
        assert_eq!(instance, json!({"outer": {"inner": 7}}));
    }
}
