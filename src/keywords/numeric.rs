//! Numeric keywords. Non-numeric instances validate as true.
//!
//! Bound comparisons go through `num_cmp` against the instance's native
//! representation; casting both sides to `f64` would silently equate
//! integers beyond its 53-bit exact range.

use std::fmt;

use num_cmp::NumCmp;
use serde_json::Value;

use crate::{
    arg::Arg,
    error::EvalError,
    helpers::instance_float,
    keywords::arg_mismatch,
    state::ValidationState,
};

/// A numeric keyword argument, kept in the width it was written in.
#[derive(Clone, Copy)]
enum Bound {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Int(i) => write!(f, "{i}"),
            Bound::Float(x) => write!(f, "{x}"),
        }
    }
}

fn bound_of(keyword: &str, arg: &Arg) -> Result<Bound, EvalError> {
    match arg {
        Arg::Int(i) => Ok(Bound::Int(*i)),
        Arg::Float(f) => Ok(Bound::Float(*f)),
        _ => Err(arg_mismatch(keyword, arg)),
    }
}

macro_rules! bound_cmp {
    ($left:expr, $op:ident, $bound:expr) => {
        match $bound {
            Bound::Int(b) => NumCmp::$op($left, b),
            Bound::Float(b) => NumCmp::$op($left, b),
        }
    };
}

/// Compares the instance with the bound without casting either side.
/// `None` for non-numeric instances.
macro_rules! instance_cmp {
    ($instance:expr, $op:ident, $bound:expr) => {
        match $instance {
            Value::Number(n) => {
                if let Some(a) = n.as_u64() {
                    Some(bound_cmp!(a, $op, $bound))
                } else if let Some(a) = n.as_i64() {
                    Some(bound_cmp!(a, $op, $bound))
                } else if let Some(a) = n.as_f64() {
                    Some(bound_cmp!(a, $op, $bound))
                } else {
                    None
                }
            }
            _ => None,
        }
    };
}

pub fn validate_multiple_of(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Some(divisor) = arg.as_float() else {
        return Err(arg_mismatch("multipleOf", arg));
    };
    let Some(value) = instance_float(instance) else {
        return Ok(());
    };
    let quotient = value / divisor;
    if quotient != quotient.trunc() || quotient.is_infinite() {
        return Err(EvalError::fail(format!(
            "\"multipleOf\" failed: value {instance} is not a multiple of {divisor}"
        )));
    }
    Ok(())
}

pub fn validate_maximum(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = bound_of("maximum", arg)?;
    if instance_cmp!(instance, num_gt, bound).unwrap_or(false) {
        return Err(EvalError::fail(format!(
            "value {instance} is larger than \"maximum\" limit {bound}"
        )));
    }
    Ok(())
}

pub fn validate_exclusive_maximum(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = bound_of("exclusiveMaximum", arg)?;
    if instance_cmp!(instance, num_ge, bound).unwrap_or(false) {
        return Err(EvalError::fail(format!(
            "value {instance} is not less than \"exclusiveMaximum\" limit {bound}"
        )));
    }
    Ok(())
}

pub fn validate_minimum(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = bound_of("minimum", arg)?;
    if instance_cmp!(instance, num_lt, bound).unwrap_or(false) {
        return Err(EvalError::fail(format!(
            "value {instance} is smaller than \"minimum\" limit {bound}"
        )));
    }
    Ok(())
}

pub fn validate_exclusive_minimum(
    arg: &Arg,
    instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let bound = bound_of("exclusiveMinimum", arg)?;
    if instance_cmp!(instance, num_le, bound).unwrap_or(false) {
        return Err(EvalError::fail(format!(
            "value {instance} is not greater than \"exclusiveMinimum\" limit {bound}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!({"maximum": 10}), json!(10), true)]
    #[test_case(json!({"maximum": 10}), json!(10.5), false)]
    #[test_case(json!({"maximum": 10.5}), json!(10), true)]
    #[test_case(json!({"exclusiveMaximum": 10}), json!(10), false)]
    #[test_case(json!({"minimum": 3}), json!(3), true)]
    #[test_case(json!({"minimum": 3}), json!(2.9), false)]
    #[test_case(json!({"exclusiveMinimum": 3}), json!(3), false)]
    #[test_case(json!({"multipleOf": 0.5}), json!(2.5), true)]
    #[test_case(json!({"multipleOf": 3}), json!(10), false)]
    #[test_case(json!({"maximum": 5}), json!("not a number"), true; "ignores non numeric")]
    fn bounds(schema: serde_json::Value, instance: serde_json::Value, valid: bool) {
        let schema = Schema::from_value(&schema).unwrap();
        assert_eq!(schema.is_valid(&instance), valid);
    }

    #[test]
    fn large_integers_compare_exactly() {
        // Adjacent values that collapse to the same f64.
        let schema = Schema::from_value(&json!({"maximum": i64::MAX - 1})).unwrap();
        assert!(schema.is_valid(&json!(i64::MAX - 1)));
        assert!(!schema.is_valid(&json!(i64::MAX)));
        assert!(!schema.is_valid(&json!(u64::MAX)));

        let schema = Schema::from_value(&json!({"minimum": i64::MIN + 1})).unwrap();
        assert!(schema.is_valid(&json!(i64::MIN + 1)));
        assert!(!schema.is_valid(&json!(i64::MIN)));

        let schema = Schema::from_value(&json!({"exclusiveMinimum": i64::MAX - 1})).unwrap();
        assert!(schema.is_valid(&json!(i64::MAX)));
        assert!(!schema.is_valid(&json!(i64::MAX - 1)));
    }
}
