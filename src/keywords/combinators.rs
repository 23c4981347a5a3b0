//! `allOf`, `anyOf`, `oneOf`, and `not`.
//!
//! Branches evaluate in place, against the same instance. Notes from
//! passing branches merge into the caller's bag so that evaluation-
//! tracking keywords see what the branches evaluated; notes from failing
//! branches are dropped.

use serde_json::Value;

use crate::{
    arg::Arg,
    error::{self, EvalError},
    keywords::arg_mismatch,
    notes::Notes,
    state::ValidationState,
};

pub fn validate_all_of(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schemas(schemas) = arg else {
        return Err(arg_mismatch("allOf", arg));
    };

    let root = state.root;
    let mut sub_state = state.child()?;
    let mut keep: Vec<Notes> = Vec::new();
    let mut acc = None;
    for (i, &sub) in schemas.iter().enumerate() {
        match root.validate_in_place(sub, instance, &mut sub_state) {
            Err(err) => error::add_error(&mut acc, err, &format!("allOf/{i}")),
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

pub fn validate_any_of(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schemas(schemas) = arg else {
        return Err(arg_mismatch("anyOf", arg));
    };

    let root = state.root;
    let mut sub_state = state.child()?;
    let mut keep: Vec<Notes> = Vec::new();
    let mut ok = false;
    let mut acc = None;
    // Every branch runs even after a success, both to surface schema
    // errors and to collect the notes of every passing branch.
    for &sub in schemas {
        match root.validate_in_place(sub, instance, &mut sub_state) {
            Err(err) if err.is_validation() => {}
            Err(fatal) => error::add_error(&mut acc, fatal, ""),
            Ok(()) => {
                ok = true;
                if !sub_state.notes.is_empty() {
                    keep.push(sub_state.notes.clone());
                }
            }
        }
        sub_state.notes.clear();
    }

    if !ok {
        // Left location-less so the part loop stamps the keyword name.
        if acc.is_none() {
            acc = Some(EvalError::fail("no \"anyOf\" schema matched"));
        }
    } else if acc.is_none() {
        state.notes.add_notes(keep);
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

pub fn validate_one_of(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schemas(schemas) = arg else {
        return Err(arg_mismatch("oneOf", arg));
    };

    let root = state.root;
    let mut sub_state = state.child()?;
    let mut keep = Notes::default();
    let mut matches = 0;
    let mut acc = None;
    for &sub in schemas {
        match root.validate_in_place(sub, instance, &mut sub_state) {
            Err(err) if err.is_validation() => {}
            Err(fatal) => error::add_error(&mut acc, fatal, ""),
            Ok(()) => {
                matches += 1;
                keep = sub_state.notes.clone();
            }
        }
        sub_state.notes.clear();
    }

    match matches {
        0 => {
            if acc.is_none() {
                acc = Some(EvalError::fail("no match for \"oneOf\" schema"));
            }
        }
        1 => {
            if acc.is_none() {
                state.notes.add_notes([keep]);
            }
        }
        n => {
            if acc.is_none() {
                acc = Some(EvalError::fail(format!("{n} matches for \"oneOf\" schema")));
            }
        }
    }
    match acc {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

pub fn validate_not(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("not", arg));
    };

    let root = state.root;
    let mut sub_state = state.child()?;
    match root.validate_in_place(*sub, instance, &mut sub_state) {
        Err(err) if err.is_validation() => {
            // The negated schema failed, so "not" matches. Its notes
            // are dropped with the child state: only passing branches
            // count as having evaluated anything.
            Ok(())
        }
        Err(fatal) => Err(fatal),
        Ok(()) => Err(EvalError::fail("\"not\" schema matched")),
    }
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn all_of_prefixes_branch_index() {
        let schema = Schema::from_value(&json!({
            "allOf": [{"type": "integer"}, {"minimum": 3}]
        }))
        .unwrap();
        assert!(schema.is_valid(&json!(5)));

        let err = schema.validate(&json!(1)).unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        let error = errors.iter().next().unwrap();
        assert_eq!(error.keyword_location, "#/allOf/1/minimum");
    }

    #[test_case(json!(3), true)]
    #[test_case(json!("s"), true)]
    #[test_case(json!(null), false)]
    fn any_of(instance: serde_json::Value, valid: bool) {
        let schema = Schema::from_value(&json!({
            "anyOf": [{"type": "integer"}, {"type": "string"}]
        }))
        .unwrap();
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test_case(json!(9), true; "matches exactly one")]
    #[test_case(json!(15), false; "matches both")]
    #[test_case(json!(2), false; "matches neither")]
    fn one_of(instance: serde_json::Value, valid: bool) {
        let schema = Schema::from_value(&json!({
            "oneOf": [{"multipleOf": 3}, {"multipleOf": 5}]
        }))
        .unwrap();
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test]
    fn not_inverts() {
        let schema = Schema::from_value(&json!({"not": {"type": "string"}})).unwrap();
        assert!(schema.is_valid(&json!(1)));
        assert!(!schema.is_valid(&json!("s")));
    }

    #[test]
    fn not_drops_notes_from_the_failed_branch() {
        // The failed branch evaluated "x" on its way to failing, but a
        // succeeding "not" must not mark anything as evaluated.
        let schema = Schema::from_value(&json!({
            "not": {"properties": {"x": true}, "required": ["y"]},
            "unevaluatedProperties": false
        }))
        .unwrap();
        assert!(!schema.is_valid(&json!({"x": 1})));
        assert!(schema.is_valid(&json!({})));
    }
}
