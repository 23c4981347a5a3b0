//! Pre-2020 array keywords: `items` in its schema-or-list form and
//! `additionalItems`. Drafts before 2020-12 use these instead of
//! `prefixItems`/`items`; the notes they exchange carry both the reach
//! and the owning node, since `additionalItems` only follows an `items`
//! in the same schema.

use serde_json::Value;

use crate::{
    arg::{Arg, SchemaOrSchemas},
    error::EvalError,
    keywords::{arg_mismatch, array::validate_element},
    notes::{ItemsNote, NoteValue},
    state::ValidationState,
};

pub fn validate_items_pre2020(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::SchemaOrSchemas(arg) = arg else {
        return Err(arg_mismatch("items", arg));
    };
    let Value::Array(items) = instance else {
        return Ok(());
    };

    let mut note = ItemsNote {
        all: false,
        len: 0,
        node: state.node,
    };
    let mut acc = None;

    match arg {
        SchemaOrSchemas::One(sub) => {
            for (i, item) in items.iter().enumerate() {
                validate_element(*sub, i, item, state, &mut acc, "items");
            }
            note.all = true;
        }
        SchemaOrSchemas::Many(subs) => {
            for (i, &sub) in subs.iter().enumerate() {
                if i >= items.len() {
                    note.all = true;
                    break;
                }
                validate_element(sub, i, &items[i], state, &mut acc, &format!("items/{i}"));
            }
            if !note.all {
                note.len = subs.len();
            }
        }
    }

    state.notes.append_items("items", note);
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

pub fn validate_additional_items(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("additionalItems", arg));
    };

    // Only meaningful after a list-form items in the same node.
    let mut start = 0;
    let mut found = false;
    if let Some(NoteValue::Items(notes)) = state.notes.get("items") {
        for note in notes {
            if note.node == state.node {
                if note.all {
                    return Ok(());
                }
                start = start.max(note.len);
                found = true;
            }
        }
    }
    if !found {
        return Ok(());
    }

    let Value::Array(items) = instance else {
        return Ok(());
    };

    let mut acc = None;
    for (i, item) in items.iter().enumerate().skip(start) {
        validate_element(*sub, i, item, state, &mut acc, "additionalItems");
    }

    state.notes.append_items(
        "items",
        ItemsNote {
            all: true,
            len: 0,
            node: state.node,
        },
    );
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

    fn draft7(body: serde_json::Value) -> Schema {
        let serde_json::Value::Object(mut map) = body else {
            panic!("schema fixtures are objects")
        };
        map.insert(
            "$schema".to_string(),
            json!("http://json-schema.org/draft-07/schema#"),
        );
        Schema::from_value(&serde_json::Value::Object(map)).unwrap()
    }

    #[test_case(json!([1, 2, 3]), true)]
    #[test_case(json!([1, "x"]), false)]
    fn single_schema_items(instance: serde_json::Value, valid: bool) {
        let schema = draft7(json!({"items": {"type": "integer"}}));
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test_case(json!(["a", 1]), true)]
    #[test_case(json!(["a", 1, "anything"]), true; "beyond the list is free without additionalItems")]
    #[test_case(json!([1]), false)]
    fn list_items(instance: serde_json::Value, valid: bool) {
        let schema = draft7(json!({"items": [{"type": "string"}, {"type": "integer"}]}));
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test_case(json!(["a", 2, 3]), true)]
    #[test_case(json!(["a", 2, "x"]), false)]
    #[test_case(json!(["a"]), true)]
    fn additional_items(instance: serde_json::Value, valid: bool) {
        let schema = draft7(json!({
            "items": [{"type": "string"}],
            "additionalItems": {"type": "integer"}
        }));
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test]
    fn additional_items_without_list_items_is_inert() {
        let schema = draft7(json!({"additionalItems": {"type": "integer"}}));
        assert!(schema.is_valid(&json!(["free", true])));
    }
}
