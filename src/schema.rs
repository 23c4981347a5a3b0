//! The schema representation and the evaluator core.
//!
//! A [`Schema`] is an arena of nodes; every node is an ordered list of
//! [`Part`]s, one per keyword. Sub-schemas are referenced by [`NodeId`],
//! so `$ref` cycles are plain data and shared targets need no ownership
//! tricks. After parsing, [`resolve`](Schema::resolve) rewrites the arena
//! once (inlining reference targets as generated parts); from then on the
//! schema is read-only and can be validated concurrently from any number
//! of threads, each call carrying its own [`ValidationState`].

use std::{fmt, sync::Arc};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{
    arg::{Arg, ArgType, ArrayOrSchema, SchemaOrSchemas},
    defaults,
    error::{self, Error, EvalError},
    resolver::ResolveOpts,
    state::{ValidateOpts, ValidationState},
    vocabulary::{Keyword, Vocabulary},
};

/// Handle of one schema node within its owning [`Schema`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The `$schema` part recording the draft URI.
pub static SCHEMA_KEYWORD: Lazy<Arc<Keyword>> =
    Lazy::new(|| Keyword::annotation("$schema", ArgType::String));

/// Not a real keyword: represents the bare `true`/`false` schemas as a
/// single part.
pub static BOOL_KEYWORD: Lazy<Arc<Keyword>> =
    Lazy::new(|| Keyword::new("$bool", ArgType::Bool, validate_bool));

fn validate_bool(
    arg: &Arg,
    _instance: &Value,
    _state: &mut ValidationState<'_>,
) -> Result<(), EvalError> {
    match arg {
        Arg::Bool(true) => Ok(()),
        Arg::Bool(false) => Err(EvalError::fail("false schema never matches")),
        _ => Err(crate::keywords::arg_mismatch("$bool", arg)),
    }
}

/// One part of a schema node: a keyword and its argument.
#[derive(Debug, Clone)]
pub struct Part {
    pub keyword: Arc<Keyword>,
    pub value: Arg,
}

impl Part {
    pub fn new(keyword: Arc<Keyword>, value: Arg) -> Part {
        Part { keyword, value }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SchemaNode {
    pub(crate) parts: Vec<Part>,
}

/// A JSON schema: decides whether an instance is valid.
///
/// Do not assemble one field by field; unmarshal from JSON with
/// [`Schema::from_value`]/[`Schema::from_slice`] or use a draft-specific
/// builder.
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) root: NodeId,
    pub(crate) vocabulary: Arc<Vocabulary>,
}

impl Schema {
    pub(crate) fn new(vocabulary: Arc<Vocabulary>) -> Schema {
        Schema {
            nodes: vec![SchemaNode::default()],
            root: NodeId::ROOT,
            vocabulary,
        }
    }

    /// The vocabulary this schema was built with.
    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn push_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SchemaNode::default());
        id
    }

    pub(crate) fn parts(&self, id: NodeId) -> &[Part] {
        &self.nodes[id.index()].parts
    }

    /// The value of a non-generated keyword in `node`, if present.
    pub fn lookup_keyword(&self, node: NodeId, keyword: &str) -> Option<&Arg> {
        self.nodes[node.index()]
            .parts
            .iter()
            .find(|p| !p.keyword.generated && p.keyword.name == keyword)
            .map(|p| &p.value)
    }

    /// Immediate sub-schemas of `node` in deterministic order, paired
    /// with their JSON Pointer names. Generated keywords are skipped;
    /// map keys come out sorted.
    pub fn children(&self, node: NodeId) -> Vec<(String, NodeId)> {
        let mut out = Vec::new();
        for part in &self.nodes[node.index()].parts {
            if part.keyword.generated {
                continue;
            }
            let name = part.keyword.name.as_str();
            match &part.value {
                Arg::Schema(id) => out.push((name.to_string(), *id)),
                Arg::Schemas(ids) => {
                    for (i, id) in ids.iter().enumerate() {
                        out.push((format!("{name}/{i}"), *id));
                    }
                }
                Arg::MapSchema(map) => {
                    for (key, id) in map {
                        out.push((format!("{name}/{}", error::escape_token(key)), *id));
                    }
                }
                Arg::SchemaOrSchemas(SchemaOrSchemas::One(id)) => {
                    out.push((name.to_string(), *id));
                }
                Arg::SchemaOrSchemas(SchemaOrSchemas::Many(ids)) => {
                    for (i, id) in ids.iter().enumerate() {
                        out.push((format!("{name}/{i}"), *id));
                    }
                }
                Arg::MapArrayOrSchema(map) => {
                    for (key, value) in map {
                        if let ArrayOrSchema::Schema(id) = value {
                            out.push((format!("{name}/{}", error::escape_token(key)), *id));
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Stably sorts the parts of `node` into the order required for
    /// validation. Called automatically by the JSON decoder and the
    /// builders; only needed explicitly after editing parts by hand.
    pub fn finalize(&mut self, node: NodeId) {
        let vocabulary = Arc::clone(&self.vocabulary);
        self.nodes[node.index()]
            .parts
            .sort_by(|a, b| vocabulary.cmp(&a.keyword.name, &b.keyword.name));
    }

    /// Resolves `$id`, anchors, and references across the schema and its
    /// sub-schemas, rewriting the arena in place. Called automatically by
    /// the JSON entry points.
    pub fn resolve(&mut self, opts: &ResolveOpts) -> Result<(), crate::SchemaError> {
        let vocabulary = match &opts.vocabulary {
            Some(v) => Arc::clone(v),
            None => Arc::clone(&self.vocabulary),
        };
        vocabulary.run_resolve(self, opts)
    }

    /// Reports whether `node` is a bare boolean schema, and which one.
    pub fn as_bool_schema(&self, node: NodeId) -> Option<bool> {
        let mut result = None;
        for part in &self.nodes[node.index()].parts {
            if part.keyword.generated || Arc::ptr_eq(&part.keyword, &SCHEMA_KEYWORD) {
                continue;
            }
            if !Arc::ptr_eq(&part.keyword, &BOOL_KEYWORD) {
                return None;
            }
            if let Arg::Bool(b) = part.value {
                result = Some(b);
            }
        }
        result
    }

    /// Moves every node of `other` into this arena, remapping node
    /// handles, and returns the new handle of `other`'s root.
    pub(crate) fn absorb(&mut self, other: Schema) -> NodeId {
        let offset = self.nodes.len() as u32;
        let root = NodeId(other.root.0 + offset);
        for mut node in other.nodes {
            for part in &mut node.parts {
                remap_arg(&mut part.value, offset);
            }
            self.nodes.push(node);
        }
        root
    }

    /// Reports whether `instance` satisfies this schema, with `format`
    /// checking enabled.
    pub fn validate(&self, instance: &Value) -> Result<(), Error> {
        self.validate_instance(
            instance,
            &ValidateOpts {
                apply_defaults: false,
                validate_format: true,
            },
        )
    }

    /// Like [`validate`](Schema::validate) but with explicit options.
    /// Takes the instance mutably because
    /// [`apply_defaults`](ValidateOpts::apply_defaults) writes into it.
    pub fn validate_with_opts(
        &self,
        instance: &mut Value,
        opts: &ValidateOpts,
    ) -> Result<(), Error> {
        if opts.apply_defaults {
            defaults::apply_defaults(self, instance).map_err(Error::Schema)?;
        }
        self.validate_instance(instance, opts)
    }

    /// Reports whether `instance` satisfies this schema.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_ok()
    }

    fn validate_instance(&self, instance: &Value, opts: &ValidateOpts) -> Result<(), Error> {
        let mut state = ValidationState::new(self, opts);
        match self.validate_sub_schema(self.root, instance, &mut state) {
            Ok(()) => Ok(()),
            Err(EvalError::Invalid(errors)) => Err(Error::Validation(errors)),
            Err(EvalError::Fatal(e)) => Err(Error::Schema(e)),
        }
    }

    /// Validates `instance` against the sub-schema `node`. The child
    /// state's notes are dropped: a sub-value's annotations do not leak
    /// into the parent node.
    pub(crate) fn validate_sub_schema(
        &self,
        node: NodeId,
        instance: &Value,
        state: &mut ValidationState<'_>,
    ) -> Result<(), EvalError> {
        let mut sub = state.child()?;
        sub.node = node;
        self.run_parts(node, instance, &mut sub)
    }

    /// Validates `instance` against `node` evaluated in the same context
    /// as the caller: notes produced by the target merge back into the
    /// caller's bag. Used by `$ref` and the combinators.
    pub(crate) fn validate_in_place(
        &self,
        node: NodeId,
        instance: &Value,
        state: &mut ValidationState<'_>,
    ) -> Result<(), EvalError> {
        let mut sub = state.child()?;
        sub.node = node;
        let result = self.run_parts(node, instance, &mut sub);
        state.notes.add_notes([sub.notes]);
        result
    }

    /// Runs every part of `node` in order, collecting validation errors
    /// so independent failures are all reported. Fatal errors
    /// short-circuit.
    fn run_parts(
        &self,
        node: NodeId,
        instance: &Value,
        state: &mut ValidationState<'_>,
    ) -> Result<(), EvalError> {
        let mut acc: Option<EvalError> = None;
        let parts = &self.nodes[node.index()].parts;
        for (index, part) in parts.iter().enumerate() {
            let Some(validate) = part.keyword.validate else {
                continue;
            };
            state.index = index;
            match validate(&part.value, instance, state) {
                Ok(()) => {}
                Err(fatal @ EvalError::Fatal(_)) => return Err(fatal),
                Err(EvalError::Invalid(errors)) => {
                    // Prefix the keyword name only onto errors that were
                    // not already stamped by a deeper context. The $bool
                    // pseudo-keyword never appears in locations.
                    let prefix = if errors.has_location()
                        || Arc::ptr_eq(&part.keyword, &BOOL_KEYWORD)
                    {
                        ""
                    } else {
                        part.keyword.name.as_str()
                    };
                    error::add_error(&mut acc, EvalError::Invalid(errors), prefix);
                }
            }
        }
        match acc {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

fn remap_arg(arg: &mut Arg, offset: u32) {
    match arg {
        Arg::Schema(id) => id.0 += offset,
        Arg::Schemas(ids) => {
            for id in ids {
                id.0 += offset;
            }
        }
        Arg::MapSchema(map) => {
            for id in map.values_mut() {
                id.0 += offset;
            }
        }
        Arg::SchemaOrSchemas(SchemaOrSchemas::One(id)) => id.0 += offset,
        Arg::SchemaOrSchemas(SchemaOrSchemas::Many(ids)) => {
            for id in ids {
                id.0 += offset;
            }
        }
        Arg::MapArrayOrSchema(map) => {
            for value in map.values_mut() {
                if let ArrayOrSchema::Schema(id) = value {
                    id.0 += offset;
                }
            }
        }
        Arg::Anchor(anchor) => anchor.node.0 += offset,
        _ => {}
    }
}

// A readable rendering of the root node. The format differs from JSON
// and includes internal parts; sub-schema values of generated keywords
// are elided, as printing them could recurse forever.
impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema{{")?;
        for (i, part) in self.nodes[self.root.index()].parts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if part.keyword.generated {
                match part.value.arg_type() {
                    ArgType::Bool | ArgType::String | ArgType::Strings | ArgType::Int
                    | ArgType::Float => write!(f, "{{{} {:?}}}", part.keyword.name, part.value)?,
                    _ => write!(f, "{{{} <not printed>}}", part.keyword.name)?,
                }
            } else {
                write!(f, "{{{} {:?}}}", part.keyword.name, part.value)?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finalize_orders_annotation_consumers_last() {
        let schema = Schema::from_value(&json!({
            "unevaluatedItems": false,
            "items": {"type": "string"},
            "prefixItems": [{"type": "integer"}],
            "contains": {"const": 1}
        }))
        .unwrap();
        let names: Vec<&str> = schema
            .parts(schema.root())
            .iter()
            .filter(|p| !p.keyword.generated)
            .map(|p| p.keyword.name.as_str())
            .collect();
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("prefixItems") < pos("items"));
        assert!(pos("items") < pos("unevaluatedItems"));
        assert!(pos("contains") < pos("unevaluatedItems"));
    }

    #[test]
    fn children_are_deterministic_and_skip_generated() {
        let schema = Schema::from_value(&json!({
            "properties": {"b": {}, "a": {}},
            "not": {"type": "null"}
        }))
        .unwrap();
        let names: Vec<String> = schema
            .children(schema.root())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["not", "properties/a", "properties/b"]);
    }

    #[test]
    fn bool_schemas() {
        let t = Schema::from_value(&json!(true)).unwrap();
        assert_eq!(t.as_bool_schema(t.root()), Some(true));
        assert!(t.is_valid(&json!({"anything": 1})));

        let f = Schema::from_value(&json!(false)).unwrap();
        assert_eq!(f.as_bool_schema(f.root()), Some(false));
        assert!(!f.is_valid(&json!(null)));

        let o = Schema::from_value(&json!({"type": "string"})).unwrap();
        assert_eq!(o.as_bool_schema(o.root()), None);
    }

    #[test]
    fn self_reference_hits_recursion_limit() {
        let schema = Schema::from_value(&json!({"$ref": "#"})).unwrap();
        match schema.validate(&json!(1)) {
            Err(Error::Schema(crate::SchemaError::RecursionLimit)) => {}
            other => panic!("expected recursion limit, got {other:?}"),
        }
    }
}
