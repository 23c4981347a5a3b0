//! JSON Pointer navigation over the schema representation.
//!
//! Not a general-purpose pointer implementation: it only needs to reach
//! sub-schemas, so each token is matched against keywords and map/list
//! arguments consume a follow-up token where their shape demands one.
//! Pointers into unknown keywords navigate the raw JSON and convert the
//! object or bool they land on into a real schema node.

use crate::{
    arg::{Arg, ArrayOrSchema, SchemaOrSchemas},
    error::SchemaError,
    schema::{NodeId, Schema},
};

/// Navigates `pointer` (already stripped of `#`) from `start` and
/// returns the node it refers to.
pub(crate) fn deref_schema(
    schema: &mut Schema,
    schema_id: &str,
    start: NodeId,
    pointer: &str,
) -> Result<NodeId, SchemaError> {
    let trimmed = pointer.strip_prefix('/').unwrap_or(pointer);
    if trimmed.is_empty() {
        return Ok(start);
    }
    let toks: Vec<String> = trimmed.split('/').map(decode_token).collect();

    let fail = |reason: String| SchemaError::Pointer {
        pointer: pointer.to_string(),
        reason,
    };

    let mut node = start;
    let mut i = 0;
    while i < toks.len() {
        let tok = &toks[i];
        let part = schema
            .parts(node)
            .iter()
            .find(|p| !p.keyword.generated && p.keyword.name == *tok)
            .cloned()
            .ok_or_else(|| fail(format!("no keyword {tok:?}")))?;

        match &part.value {
            Arg::Schema(id) => node = *id,

            Arg::Schemas(ids) => {
                i += 1;
                let idx = index_token(&toks, i, pointer)?;
                node = *ids
                    .get(idx)
                    .ok_or_else(|| fail(format!("index {idx} out of range (length {})", ids.len())))?;
            }

            Arg::MapSchema(map) => {
                i += 1;
                let key = key_token(&toks, i, pointer)?;
                node = *map
                    .get(key)
                    .ok_or_else(|| fail(format!("map key {key:?} not present")))?;
            }

            Arg::SchemaOrSchemas(SchemaOrSchemas::One(id)) => node = *id,

            Arg::SchemaOrSchemas(SchemaOrSchemas::Many(ids)) => {
                i += 1;
                let idx = index_token(&toks, i, pointer)?;
                node = *ids
                    .get(idx)
                    .ok_or_else(|| fail(format!("index {idx} out of range (length {})", ids.len())))?;
            }

            Arg::MapArrayOrSchema(map) => {
                i += 1;
                let key = key_token(&toks, i, pointer)?;
                match map.get(key) {
                    Some(ArrayOrSchema::Schema(id)) => node = *id,
                    Some(ArrayOrSchema::Array(_)) => {
                        return Err(fail(format!("map key {key:?} is not a schema")))
                    }
                    None => return Err(fail(format!("map key {key:?} not present"))),
                }
            }

            Arg::Any(value) => {
                // Walk the raw JSON until it turns into something that
                // can be a schema, then graft it into the arena.
                let mut current = value.clone();
                loop {
                    match current {
                        serde_json::Value::Bool(_) | serde_json::Value::Object(_) => {
                            let built = Schema::parse_unresolved(Some(schema_id), &current)
                                .map_err(|e| {
                                    fail(format!("failed to decode unrecognized schema: {e}"))
                                })?;
                            node = schema.absorb(built);
                            break;
                        }
                        serde_json::Value::Array(items) => {
                            i += 1;
                            let idx = index_token(&toks, i, pointer)?;
                            current = items.get(idx).cloned().ok_or_else(|| {
                                fail(format!(
                                    "index {idx} out of range (length {})",
                                    items.len()
                                ))
                            })?;
                        }
                        other => {
                            return Err(fail(format!(
                                "unexpected value {other} under unrecognized keyword"
                            )))
                        }
                    }
                }
            }

            other => {
                return Err(fail(format!(
                    "keyword {tok:?} has non-schema argument type {}",
                    other.arg_type().name()
                )))
            }
        }
        i += 1;
    }

    Ok(node)
}

fn index_token(toks: &[String], i: usize, pointer: &str) -> Result<usize, SchemaError> {
    let tok = toks.get(i).ok_or_else(|| SchemaError::Pointer {
        pointer: pointer.to_string(),
        reason: "expected array index at end of pointer".to_string(),
    })?;
    tok.parse().map_err(|_| SchemaError::Pointer {
        pointer: pointer.to_string(),
        reason: format!("got token {tok:?}, expected array index"),
    })
}

fn key_token<'a>(toks: &'a [String], i: usize, pointer: &str) -> Result<&'a str, SchemaError> {
    toks.get(i).map(String::as_str).ok_or_else(|| SchemaError::Pointer {
        pointer: pointer.to_string(),
        reason: "expected map key at end of pointer".to_string(),
    })
}

/// Unmangles one token: `~1` is `/`, `~0` is `~`.
fn decode_token(tok: &str) -> String {
    tok.replace("~1", "/").replace("~0", "~")
}
