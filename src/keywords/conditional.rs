//! `if`, `then`, and `else`.
//!
//! `if` always succeeds; it records its outcome as a note that `then`
//! and `else` consult. The keyword ordering keeps `if` first.

use serde_json::Value;

use crate::{
    arg::Arg,
    error::EvalError,
    keywords::arg_mismatch,
    notes::NoteValue,
    state::ValidationState,
};

pub fn validate_if(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch("if", arg));
    };

    let root = state.root;
    let mut sub_state = state.child()?;
    let ok = match root.validate_in_place(*sub, instance, &mut sub_state) {
        Ok(()) => {
            state.notes.add_notes([sub_state.notes]);
            true
        }
        Err(err) if err.is_validation() => false,
        Err(fatal) => return Err(fatal),
    };
    state.notes.set("if", NoteValue::Flag(ok));
    Ok(())
}

pub fn validate_then(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    if state.notes.flag("if") != Some(true) {
        return Ok(());
    }
    branch("then", arg, instance, state)
}

pub fn validate_else(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    if state.notes.flag("if") != Some(false) {
        return Ok(());
    }
    branch("else", arg, instance, state)
}

// Both branches validate against a child state and merge its notes on
// success.
fn branch(
    keyword: &str,
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Schema(sub) = arg else {
        return Err(arg_mismatch(keyword, arg));
    };
    let root = state.root;
    let mut sub_state = state.child()?;
    let result = root.validate_in_place(*sub, instance, &mut sub_state);
    if result.is_ok() {
        state.notes.add_notes([sub_state.notes]);
    }
    result
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!({"country": "US", "zip": "90210"}), true)]
    #[test_case(json!({"country": "US"}), false; "then applies")]
    #[test_case(json!({"country": "NL"}), true; "else is vacuous here")]
    fn conditional_requirements(instance: serde_json::Value, valid: bool) {
        let schema = Schema::from_value(&json!({
            "if": {"properties": {"country": {"const": "US"}}, "required": ["country"]},
            "then": {"required": ["zip"]}
        }))
        .unwrap();
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test_case(json!(5), true)]
    #[test_case(json!(-5), false)]
    #[test_case(json!("s"), true; "if fails then else applies vacuously")]
    fn else_branch(instance: serde_json::Value, valid: bool) {
        let schema = Schema::from_value(&json!({
            "if": {"type": "number"},
            "then": {"minimum": 0},
            "else": {"type": "string"}
        }))
        .unwrap();
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test]
    fn then_without_if_is_inert() {
        let schema = Schema::from_value(&json!({"then": {"type": "string"}})).unwrap();
        assert!(schema.is_valid(&json!(1)));
    }
}
