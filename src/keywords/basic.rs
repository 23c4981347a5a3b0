//! `type`, `enum`, and `const`.

use serde_json::Value;

use crate::{
    arg::{Arg, StringOrStrings},
    error::{EvalError, SchemaError},
    helpers,
    keywords::arg_mismatch,
    state::ValidationState,
};

fn matches_type(name: &str, instance: &Value) -> Result<bool, EvalError> {
    Ok(match name {
        "null" => instance.is_null(),
        "boolean" => instance.is_boolean(),
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => match instance {
            // Integer-valued floats count: 1.0 is an integer, 1.5 is not.
            Value::Number(n) => {
                n.is_i64()
                    || n.is_u64()
                    || n.as_f64().is_some_and(|f| f.trunc() == f && f.is_finite())
            }
            _ => false,
        },
        other => {
            return Err(EvalError::Fatal(SchemaError::Malformed {
                reason: format!("\"type\" argument is unsupported string {other:?}"),
            }))
        }
    })
}

/// The instance's type as reported in error messages.
fn type_name(instance: &Value) -> &'static str {
    match instance {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.trunc() == f && f.is_finite())
            {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn validate_type(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::StringOrStrings(arg) = arg else {
        return Err(arg_mismatch("type", arg));
    };
    match arg {
        StringOrStrings::One(want) => {
            if matches_type(want, instance)? {
                Ok(())
            } else {
                Err(EvalError::fail(format!(
                    "instance has type {:?}, want {want:?}",
                    type_name(instance)
                )))
            }
        }
        StringOrStrings::Many(wants) => {
            for want in wants {
                if matches_type(want, instance)? {
                    return Ok(());
                }
            }
            Err(EvalError::fail(format!(
                "instance has type {:?}, want one of {wants:?}",
                type_name(instance)
            )))
        }
    }
}

pub fn validate_enum(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Any(Value::Array(options)) = arg else {
        return Err(EvalError::Fatal(SchemaError::Malformed {
            reason: "\"enum\" argument must be an array".to_string(),
        }));
    };
    if options.iter().any(|o| helpers::equal(instance, o)) {
        Ok(())
    } else {
        Err(EvalError::fail("no \"enum\" value matched"))
    }
}

pub fn validate_const(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Any(expected) = arg else {
        return Err(arg_mismatch("const", arg));
    };
    if helpers::equal(instance, expected) {
        Ok(())
    } else {
        Err(EvalError::fail(format!(
            "\"const\" failed: got {instance}, want {expected}"
        )))
    }
}
