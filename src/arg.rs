//! Keyword argument values.
//!
//! Every schema part carries one [`Arg`], a tagged value whose shape is
//! dictated by the keyword's declared [`ArgType`]. The two enums are kept
//! in lockstep: [`Arg::arg_type`] recovers the tag of a value, and the
//! builder refuses to attach a value whose tag does not match the keyword.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::NodeId;

/// The expected argument shape of a schema keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// A bare boolean, e.g. `uniqueItems`.
    Bool,
    /// A single string, e.g. `pattern`.
    String,
    /// A list of strings, e.g. `required`.
    Strings,
    /// A single string or a list of strings. This exists for `type`.
    StringOrStrings,
    /// An integer, e.g. `minLength`. Integer-valued floats are accepted
    /// when decoding JSON; other floats are rejected.
    Int,
    /// A number, e.g. `maximum`.
    Float,
    /// A sub-schema, e.g. `not`.
    Schema,
    /// A list of sub-schemas, e.g. `allOf`.
    Schemas,
    /// A map from names to sub-schemas, e.g. `properties`.
    MapSchema,
    /// A single sub-schema or a list of them. This exists for the
    /// pre-2020 form of `items`.
    SchemaOrSchemas,
    /// A map whose values are either arrays of strings or sub-schemas.
    /// This exists for the draft 7 `dependencies` keyword.
    MapArrayOrSchema,
    /// An arbitrary JSON value, e.g. `enum` or any unknown keyword.
    Any,
}

impl ArgType {
    /// A short name for messages.
    pub fn name(self) -> &'static str {
        match self {
            ArgType::Bool => "bool",
            ArgType::String => "string",
            ArgType::Strings => "strings",
            ArgType::StringOrStrings => "stringOrStrings",
            ArgType::Int => "int",
            ArgType::Float => "float",
            ArgType::Schema => "schema",
            ArgType::Schemas => "schemas",
            ArgType::MapSchema => "mapSchema",
            ArgType::SchemaOrSchemas => "schemaOrSchemas",
            ArgType::MapArrayOrSchema => "mapArrayOrSchema",
            ArgType::Any => "any",
        }
    }
}

/// A single string or a list of strings.
#[derive(Debug, Clone, PartialEq)]
pub enum StringOrStrings {
    One(String),
    Many(Vec<String>),
}

/// A single sub-schema or a list of sub-schemas.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOrSchemas {
    One(NodeId),
    Many(Vec<NodeId>),
}

/// One value of a [`ArgType::MapArrayOrSchema`] map.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayOrSchema {
    Array(Vec<String>),
    Schema(NodeId),
}

/// The argument of a generated scope-management part: the name of a
/// dynamic anchor together with the node it is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorArg {
    pub name: String,
    pub node: NodeId,
}

/// The value attached to a schema keyword.
///
/// Sub-schemas are referenced by [`NodeId`] into the owning
/// [`Schema`](crate::Schema) arena; a reference graph with cycles is
/// therefore representable without shared ownership.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Bool(bool),
    String(String),
    Strings(Vec<String>),
    StringOrStrings(StringOrStrings),
    Int(i64),
    Float(f64),
    Schema(NodeId),
    Schemas(Vec<NodeId>),
    MapSchema(BTreeMap<String, NodeId>),
    SchemaOrSchemas(SchemaOrSchemas),
    MapArrayOrSchema(BTreeMap<String, ArrayOrSchema>),
    Any(Value),
    /// Carried only by the generated `$$recordDynamicAnchor` and
    /// `$$clearDynamicAnchor` parts; never decoded from or encoded to
    /// JSON. Its tag is [`ArgType::Any`].
    Anchor(AnchorArg),
}

impl Arg {
    /// The tag of this value.
    pub fn arg_type(&self) -> ArgType {
        match self {
            Arg::Bool(_) => ArgType::Bool,
            Arg::String(_) => ArgType::String,
            Arg::Strings(_) => ArgType::Strings,
            Arg::StringOrStrings(_) => ArgType::StringOrStrings,
            Arg::Int(_) => ArgType::Int,
            Arg::Float(_) => ArgType::Float,
            Arg::Schema(_) => ArgType::Schema,
            Arg::Schemas(_) => ArgType::Schemas,
            Arg::MapSchema(_) => ArgType::MapSchema,
            Arg::SchemaOrSchemas(_) => ArgType::SchemaOrSchemas,
            Arg::MapArrayOrSchema(_) => ArgType::MapArrayOrSchema,
            Arg::Any(_) | Arg::Anchor(_) => ArgType::Any,
        }
    }

    /// The argument as an integer, accepting integer-valued floats.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(i) => Some(*i),
            Arg::Float(f) if f.trunc() == *f && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// The argument as a float, accepting integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Arg::Int(i) => Some(*i as f64),
            Arg::Float(f) => Some(*f),
            _ => None,
        }
    }
}
