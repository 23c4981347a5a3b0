//! String keywords. Lengths count Unicode code points, not bytes.

use serde_json::Value;

use crate::{
    arg::Arg,
    error::{EvalError, SchemaError},
    helpers::compiled_regex,
    keywords::arg_mismatch,
    state::ValidationState,
};

fn length_bound(keyword: &str, arg: &Arg) -> Result<i64, EvalError> {
    let n = arg.as_int().ok_or_else(|| arg_mismatch(keyword, arg))?;
    if n < 0 {
        return Err(EvalError::Fatal(SchemaError::Malformed {
            reason: format!("{keyword:?} argument is {n}, must be non-negative"),
        }));
    }
    Ok(n)
}

pub fn validate_max_length(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = length_bound("maxLength", arg)?;
    if let Value::String(s) = instance {
        if s.chars().count() as i64 > bound {
            return Err(EvalError::fail(format!(
                "value {s:?} too long for \"maxLength\" argument {bound}"
            )));
        }
    }
    Ok(())
}

pub fn validate_min_length(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = length_bound("minLength", arg)?;
    if let Value::String(s) = instance {
        if (s.chars().count() as i64) < bound {
            return Err(EvalError::fail(format!(
                "value {s:?} too short for \"minLength\" argument {bound}"
            )));
        }
    }
    Ok(())
}

pub fn validate_pattern(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::String(pattern) = arg else {
        return Err(arg_mismatch("pattern", arg));
    };
    let Value::String(s) = instance else {
        return Ok(());
    };
    let re = compiled_regex(pattern)?;
    match re.find(s) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(EvalError::fail(format!(
            "\"pattern\" regexp {pattern:?} did not match {s:?}"
        ))),
        Err(e) => Err(EvalError::Fatal(SchemaError::Malformed {
            reason: format!("\"pattern\" regexp {pattern:?} failed: {e}"),
        })),
    }
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn lengths_count_code_points() {
        let schema = Schema::from_value(&json!({"minLength": 3, "maxLength": 3})).unwrap();
        assert!(schema.is_valid(&json!("äöü")));
        assert!(!schema.is_valid(&json!("ab")));
        assert!(!schema.is_valid(&json!("abcd")));
        assert!(schema.is_valid(&json!(42)));
    }

    #[test_case("^f", "foo", true)]
    #[test_case("^f", "bar", false)]
    #[test_case("a+c", "xabcx", false; "unanchored substring")]
    #[test_case("ab+c", "xabbcx", true)]
    fn patterns(pattern: &str, text: &str, valid: bool) {
        let schema = Schema::from_value(&json!({"pattern": pattern})).unwrap();
        assert_eq!(schema.is_valid(&json!(text)), valid);
    }
}
