//! Keyword validators.
//!
//! Each validator takes the keyword's argument, the instance, and the
//! current [`ValidationState`](crate::ValidationState), and either
//! succeeds, reports accumulated validation failures, or aborts with a
//! fatal schema error. Validators that apply only to one instance kind
//! (numeric keywords to numbers, object keywords to objects, ...)
//! validate everything else as true.

pub mod array;
pub mod basic;
pub mod combinators;
pub mod conditional;
pub mod legacy;
pub mod numeric;
pub mod object;
pub mod references;
pub mod string;
pub mod unevaluated;

use serde_json::Value;

use crate::{
    arg::Arg,
    error::{EvalError, SchemaError},
    state::ValidationState,
};

/// A validator for keywords that always match. Such keywords carry
/// meaning for the schema without affecting the validation outcome.
pub fn validate_true(
    _arg: &Arg,
    _instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    Ok(())
}

/// A keyword argument whose runtime shape contradicts its declared type.
/// The IR builder makes this unreachable for decoded schemas; hitting it
/// means a hand-assembled part went wrong, which is fatal.
pub(crate) fn arg_mismatch(keyword: &str, arg: &Arg) -> EvalError {
    EvalError::Fatal(SchemaError::Malformed {
        reason: format!(
            "{keyword:?} argument has unexpected type {}",
            arg.arg_type().name()
        ),
    })
}
