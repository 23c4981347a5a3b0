//! JSON encoding and decoding of schemas.
//!
//! Decoding dispatches each keyword on the argument shape its vocabulary
//! declares; unknown keywords are kept as inert parts so they survive
//! serialization and pointer navigation without affecting validation.
//! Encoding is the inverse, minus generated keywords: bool-schema nodes
//! come out as bare `true`/`false`, integer-valued floats as integers,
//! and object keys sorted.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::{
    arg::{Arg, ArgType, ArrayOrSchema, SchemaOrSchemas, StringOrStrings},
    error::SchemaError,
    resolver::ResolveOpts,
    schema::{NodeId, Schema, BOOL_KEYWORD, SCHEMA_KEYWORD},
    vocabulary::{self, Vocabulary},
};

impl Schema {
    /// Parses a schema from raw JSON and resolves its references using
    /// the globally configured loader.
    pub fn from_slice(data: &[u8]) -> Result<Schema, SchemaError> {
        let value: Value = serde_json::from_slice(data)?;
        Schema::from_value(&value)
    }

    /// Builds a schema from an already parsed JSON value and resolves
    /// its references using the globally configured loader.
    pub fn from_value(value: &Value) -> Result<Schema, SchemaError> {
        let mut schema = Schema::parse_unresolved(None, value)?;
        schema.resolve(&ResolveOpts::default())?;
        Ok(schema)
    }

    /// Builds a schema from parsed JSON without resolving references.
    ///
    /// The optional `schema_id` supplies the draft to assume when the
    /// document has no `$schema`, e.g. [`crate::draft202012::SCHEMA_ID`].
    /// Loaders use this to hand documents back to the resolver, which
    /// then resolves them within its own state. Anyone else should call
    /// [`Schema::resolve`] on the result.
    pub fn parse_unresolved(schema_id: Option<&str>, value: &Value) -> Result<Schema, SchemaError> {
        let mut version: Option<&str> = None;
        if let Value::Object(map) = value {
            if let Some(v) = map.get("$schema") {
                match v {
                    Value::String(s) => version = Some(s),
                    _ => {
                        return Err(SchemaError::InvalidKeyword {
                            keyword: "$schema".to_string(),
                            reason: "does not have a string value".to_string(),
                        })
                    }
                }
            }
        }
        let explicit = version.is_some();
        let version = version.or(schema_id);

        let vocabulary = match version {
            None => vocabulary::default_vocabulary().ok_or(SchemaError::NoDefaultVocabulary)?,
            Some(v) => {
                vocabulary::lookup_vocabulary(v).ok_or_else(|| SchemaError::UnknownVocabulary {
                    schema: v.to_string(),
                })?
            }
        };

        let mut schema = Schema::new(Arc::clone(&vocabulary));
        let recorded = if explicit {
            version.map(str::to_string)
        } else {
            Some(vocabulary.schema_id.clone())
        };
        if let Some(uri) = recorded {
            schema.node_mut(NodeId::ROOT).parts.push(crate::Part::new(
                Arc::clone(&SCHEMA_KEYWORD),
                Arg::String(uri),
            ));
        }

        build_from_json(&mut schema, NodeId::ROOT, value, &vocabulary, true)?;
        Ok(schema)
    }

    /// The canonical JSON rendering of this schema.
    pub fn to_value(&self) -> Value {
        self.node_to_value(self.root())
    }

    pub(crate) fn node_to_value(&self, node: NodeId) -> Value {
        if let Some(b) = self.as_bool_schema(node) {
            return Value::Bool(b);
        }
        let mut map = Map::new();
        for part in self.parts(node) {
            if part.keyword.generated {
                continue;
            }
            map.insert(part.keyword.name.clone(), self.arg_to_value(&part.value));
        }
        Value::Object(map)
    }

    fn arg_to_value(&self, arg: &Arg) -> Value {
        match arg {
            Arg::Bool(b) => Value::Bool(*b),
            Arg::String(s) => Value::String(s.clone()),
            Arg::Strings(v) => Value::Array(v.iter().cloned().map(Value::String).collect()),
            Arg::StringOrStrings(StringOrStrings::One(s)) => Value::String(s.clone()),
            Arg::StringOrStrings(StringOrStrings::Many(v)) => {
                Value::Array(v.iter().cloned().map(Value::String).collect())
            }
            Arg::Int(i) => Value::Number(Number::from(*i)),
            Arg::Float(f) => float_to_value(*f),
            Arg::Schema(id) => self.node_to_value(*id),
            Arg::Schemas(ids) => {
                Value::Array(ids.iter().map(|id| self.node_to_value(*id)).collect())
            }
            Arg::MapSchema(m) => Value::Object(
                m.iter()
                    .map(|(k, id)| (k.clone(), self.node_to_value(*id)))
                    .collect(),
            ),
            Arg::SchemaOrSchemas(SchemaOrSchemas::One(id)) => self.node_to_value(*id),
            Arg::SchemaOrSchemas(SchemaOrSchemas::Many(ids)) => {
                Value::Array(ids.iter().map(|id| self.node_to_value(*id)).collect())
            }
            Arg::MapArrayOrSchema(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| {
                        let value = match v {
                            ArrayOrSchema::Schema(id) => self.node_to_value(*id),
                            ArrayOrSchema::Array(strs) => Value::Array(
                                strs.iter().cloned().map(Value::String).collect(),
                            ),
                        };
                        (k.clone(), value)
                    })
                    .collect(),
            ),
            Arg::Any(v) => v.clone(),
            // Generated-only; filtered out before we get here.
            Arg::Anchor(_) => Value::Null,
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Integer-valued floats serialize as integers, mirroring how most
/// schemas write bounds like `"maximum": 100`.
fn float_to_value(f: f64) -> Value {
    if f.is_finite() && f.trunc() == f && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Value::Number(Number::from(f as i64))
    } else {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

pub(crate) fn build_from_json(
    schema: &mut Schema,
    node: NodeId,
    value: &Value,
    vocabulary: &Arc<Vocabulary>,
    top: bool,
) -> Result<(), SchemaError> {
    match value {
        Value::Bool(b) => {
            schema
                .node_mut(node)
                .parts
                .push(crate::Part::new(Arc::clone(&BOOL_KEYWORD), Arg::Bool(*b)));
            Ok(())
        }
        Value::Object(map) => {
            for (keyword, val) in map {
                if top && keyword == "$schema" {
                    continue;
                }
                add_keyword_from_json(schema, node, keyword, val, vocabulary)?;
            }
            schema.finalize(node);
            Ok(())
        }
        other => Err(SchemaError::InvalidKeyword {
            keyword: "schema".to_string(),
            reason: format!("unexpected JSON value {other} while decoding schema"),
        }),
    }
}

fn add_keyword_from_json(
    schema: &mut Schema,
    node: NodeId,
    keyword: &str,
    value: &Value,
    vocabulary: &Arc<Vocabulary>,
) -> Result<(), SchemaError> {
    if keyword.is_empty() {
        return Err(SchemaError::InvalidKeyword {
            keyword: String::new(),
            reason: "empty JSON keyword".to_string(),
        });
    }

    let Some(descriptor) = vocabulary.keyword(keyword).cloned() else {
        // Unrecognized keywords are kept but do not affect validation.
        schema.node_mut(node).parts.push(crate::Part::new(
            crate::Keyword::unknown(keyword),
            Arg::Any(value.clone()),
        ));
        return Ok(());
    };

    let mismatch = |want: &str| SchemaError::InvalidKeyword {
        keyword: keyword.to_string(),
        reason: format!("argument is {}, want {want}", json_type_name(value)),
    };

    let arg = match descriptor.arg_type {
        ArgType::Bool => match value {
            Value::Bool(b) => Arg::Bool(*b),
            _ => return Err(mismatch("bool")),
        },
        ArgType::String => match value {
            Value::String(s) => Arg::String(s.clone()),
            _ => return Err(mismatch("string")),
        },
        ArgType::Strings => Arg::Strings(string_array(keyword, value)?),
        ArgType::StringOrStrings => match value {
            Value::String(s) => Arg::StringOrStrings(StringOrStrings::One(s.clone())),
            Value::Array(_) => {
                Arg::StringOrStrings(StringOrStrings::Many(string_array(keyword, value)?))
            }
            _ => return Err(mismatch("string or array of strings")),
        },
        ArgType::Int => match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Arg::Int(i)
                } else if let Some(f) = n.as_f64() {
                    if f.trunc() == f && f.is_finite() {
                        Arg::Int(f as i64)
                    } else {
                        return Err(SchemaError::InvalidKeyword {
                            keyword: keyword.to_string(),
                            reason: "argument is non-integer, want integer".to_string(),
                        });
                    }
                } else {
                    return Err(mismatch("integer"));
                }
            }
            _ => return Err(mismatch("integer")),
        },
        ArgType::Float => match value {
            // Integer-written bounds keep their full width; going
            // through f64 would round values beyond its exact range.
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Arg::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Arg::Float(f)
                } else {
                    return Err(mismatch("number"));
                }
            }
            _ => return Err(mismatch("number")),
        },
        ArgType::Schema => Arg::Schema(sub_schema(schema, value, vocabulary)?),
        ArgType::Schemas => match value {
            Value::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    ids.push(sub_schema(schema, item, vocabulary)?);
                }
                Arg::Schemas(ids)
            }
            _ => return Err(mismatch("array of schemas")),
        },
        ArgType::MapSchema => match value {
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), sub_schema(schema, v, vocabulary)?);
                }
                Arg::MapSchema(out)
            }
            _ => return Err(mismatch("object of schemas")),
        },
        ArgType::SchemaOrSchemas => match value {
            Value::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    ids.push(sub_schema(schema, item, vocabulary)?);
                }
                Arg::SchemaOrSchemas(SchemaOrSchemas::Many(ids))
            }
            _ => Arg::SchemaOrSchemas(SchemaOrSchemas::One(sub_schema(schema, value, vocabulary)?)),
        },
        ArgType::MapArrayOrSchema => match value {
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    let entry = match v {
                        Value::Bool(_) | Value::Object(_) => {
                            ArrayOrSchema::Schema(sub_schema(schema, v, vocabulary)?)
                        }
                        Value::Array(_) => ArrayOrSchema::Array(string_array(keyword, v)?),
                        _ => {
                            return Err(SchemaError::InvalidKeyword {
                                keyword: keyword.to_string(),
                                reason: format!(
                                    "item {k:?} is {}, want schema or array of strings",
                                    json_type_name(v)
                                ),
                            })
                        }
                    };
                    out.insert(k.clone(), entry);
                }
                Arg::MapArrayOrSchema(out)
            }
            _ => return Err(mismatch("object")),
        },
        ArgType::Any => Arg::Any(value.clone()),
    };

    schema
        .node_mut(node)
        .parts
        .push(crate::Part::new(descriptor, arg));
    Ok(())
}

fn sub_schema(
    schema: &mut Schema,
    value: &Value,
    vocabulary: &Arc<Vocabulary>,
) -> Result<NodeId, SchemaError> {
    let node = schema.push_node();
    build_from_json(schema, node, value, vocabulary, false)?;
    Ok(node)
}

fn string_array(keyword: &str, value: &Value) -> Result<Vec<String>, SchemaError> {
    let Value::Array(items) = value else {
        return Err(SchemaError::InvalidKeyword {
            keyword: keyword.to_string(),
            reason: format!("argument is {}, want array of strings", json_type_name(value)),
        });
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => out.push(s.clone()),
            other => {
                return Err(SchemaError::InvalidKeyword {
                    keyword: keyword.to_string(),
                    reason: format!("item {i} is {}, want string", json_type_name(other)),
                })
            }
        }
    }
    Ok(out)
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
