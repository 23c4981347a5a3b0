//! `$ref`, `$dynamicRef`, and the generated scope-management keywords.
//!
//! By the time validation runs, the resolver has rewritten every
//! reference into a generated sibling part carrying the target node, so
//! `$ref` only has to find that part and evaluate the target in place.
//! `$dynamicRef` may instead consult the dynamic-anchor scope that the
//! generated `$$recordDynamicAnchor`/`$$clearDynamicAnchor` parts
//! maintain in the call's `version_data` slot.

use std::sync::Arc;

use ahash::AHashMap;
use serde_json::Value;

use crate::{
    arg::Arg,
    error::{EvalError, SchemaError},
    keywords::arg_mismatch,
    resolver::{DETACHED_DYNAMIC_REF, RESOLVED_DYNAMIC_REF, RESOLVED_REF},
    schema::NodeId,
    state::ValidationState,
    uri,
    vocabulary::Keyword,
};

/// The dynamic-anchor scope of one validation call: anchor name to the
/// outermost node currently recording it.
#[derive(Debug, Default)]
pub(crate) struct DynamicScope {
    anchors: AHashMap<String, NodeId>,
}

fn with_scope<R>(
    state: &ValidationState<'_>,
    f: impl FnOnce(&mut DynamicScope) -> R,
) -> Result<R, EvalError> {
    let mut slot = state.version_data.borrow_mut();
    let any = slot
        .get_or_insert_with(|| Box::new(DynamicScope::default()) as Box<dyn std::any::Any>);
    match any.downcast_mut::<DynamicScope>() {
        Some(scope) => Ok(f(scope)),
        None => Err(EvalError::Fatal(SchemaError::Malformed {
            reason: "version data holds foreign draft state".to_string(),
        })),
    }
}

fn find_generated(state: &ValidationState<'_>, keyword: &Arc<Keyword>) -> Option<NodeId> {
    state
        .root
        .parts(state.node)
        .iter()
        .find(|p| Arc::ptr_eq(&p.keyword, keyword))
        .and_then(|p| match &p.value {
            Arg::Schema(node) => Some(*node),
            _ => None,
        })
}

pub fn validate_ref(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::String(reference) = arg else {
        return Err(arg_mismatch("$ref", arg));
    };
    match find_generated(state, &RESOLVED_REF) {
        Some(target) => {
            let root = state.root;
            root.validate_in_place(target, instance, state)
        }
        // The resolver guarantees the sibling part; its absence is a
        // resolution bug, not an instance failure.
        None => Err(EvalError::Fatal(SchemaError::Malformed {
            reason: format!("reference {reference:?} unresolved"),
        })),
    }
}

pub fn validate_dynamic_ref(
    arg: &Arg,
    instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::String(reference) = arg else {
        return Err(arg_mismatch("$dynamicRef", arg));
    };

    // Resolved statically when the target anchor is not dynamic.
    let mut target = find_generated(state, &RESOLVED_DYNAMIC_REF);

    if target.is_none() {
        target = dynamic_target(reference, state)?;
    }
    if target.is_none() {
        // The lexical fallback, for evaluations that entered below the
        // base that records the anchor.
        target = find_generated(state, &DETACHED_DYNAMIC_REF);
    }

    match target {
        Some(target) => {
            let root = state.root;
            root.validate_in_place(target, instance, state)
        }
        None => Err(EvalError::Fatal(SchemaError::Malformed {
            reason: format!("dynamic reference {reference:?} unresolved"),
        })),
    }
}

/// Looks the reference's plain-name fragment up in the dynamic scope.
fn dynamic_target(
    reference: &str,
    state: &ValidationState<'_>,
) -> Result<Option<NodeId>, EvalError> {
    let parsed = uri::from_str(reference)?;
    let Some(fragment) = uri::fragment_decoded(&parsed) else {
        return Ok(None);
    };
    if fragment.is_empty() || fragment.starts_with('/') {
        return Ok(None);
    }
    with_scope(state, |scope| scope.anchors.get(&fragment).copied())
}

/// `$$recordDynamicAnchor`: adds the anchor to the scope for the
/// duration of its base schema's evaluation. An anchor already in scope
/// stays: dynamic anchors resolve to the outermost recording.
pub fn validate_record_dynamic_anchor(
    arg: &Arg,
    _instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Anchor(anchor) = arg else {
        return Err(arg_mismatch("$$recordDynamicAnchor", arg));
    };
    with_scope(state, |scope| {
        scope
            .anchors
            .entry(anchor.name.clone())
            .or_insert(anchor.node);
    })
}

/// `$$clearDynamicAnchor`: removes the anchor, but only if this node's
/// recording is the one in effect; a nested re-entry of the same base
/// must not clear its outer scope.
pub fn validate_clear_dynamic_anchor(
    arg: &Arg,
    _instance: &Value,
    state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    let Arg::Anchor(anchor) = arg else {
        return Err(arg_mismatch("$$clearDynamicAnchor", arg));
    };
    with_scope(state, |scope| {
        if scope.anchors.get(&anchor.name) == Some(&anchor.node) {
            scope.anchors.remove(&anchor.name);
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::Schema;
    use serde_json::json;

    #[test]
    fn ref_validates_target_in_place() {
        let schema = Schema::from_value(&json!({
            "$defs": {"positive": {"type": "integer", "minimum": 1}},
            "$ref": "#/$defs/positive"
        }))
        .unwrap();
        assert!(schema.is_valid(&json!(3)));
        assert!(!schema.is_valid(&json!(0)));
        assert!(!schema.is_valid(&json!("x")));
    }

    #[test]
    fn dynamic_ref_to_static_anchor_is_static() {
        let schema = Schema::from_value(&json!({
            "$id": "https://example.com/s",
            "$defs": {"t": {"$anchor": "T", "type": "string"}},
            "$dynamicRef": "#T"
        }))
        .unwrap();
        assert!(schema.is_valid(&json!("ok")));
        assert!(!schema.is_valid(&json!(1)));
    }

    #[test]
    fn dynamic_anchor_resolves_outermost() {
        // The outer document overrides the anchor the inner document
        // declares; validating through the outer one must use the
        // override, validating the inner one alone must not.
        let schema = Schema::from_value(&json!({
            "$id": "https://example.com/outer",
            "$ref": "https://example.com/inner",
            "$defs": {
                "override": {"$dynamicAnchor": "T", "type": "integer"},
                "inner": {
                    "$id": "https://example.com/inner",
                    "$dynamicRef": "#T",
                    "$defs": {
                        "fallback": {"$dynamicAnchor": "T", "type": "string"}
                    }
                }
            }
        }))
        .unwrap();
        assert!(schema.is_valid(&json!(7)));
        assert!(!schema.is_valid(&json!("7")));

        let inner_only = Schema::from_value(&json!({
            "$id": "https://example.com/inner",
            "$dynamicRef": "#T",
            "$defs": {
                "fallback": {"$dynamicAnchor": "T", "type": "string"}
            }
        }))
        .unwrap();
        assert!(inner_only.is_valid(&json!("7")));
        assert!(!inner_only.is_valid(&json!(7)));
    }
}
