//! Programmatic schema construction.
//!
//! [`Builder`] assembles a schema part by part with shape-checked `add_*`
//! methods; attaching a value whose shape does not match the keyword's
//! declared argument type is a programming error and panics. The
//! draft-specific builders wrap this one with a named method per
//! keyword.
//!
//! Builders do not support reference keywords (`$ref`, `$dynamicRef`) or
//! anchors: those need the resolver, which runs on decoded documents.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use crate::{
    arg::{Arg, ArgType, StringOrStrings},
    schema::{NodeId, Schema, BOOL_KEYWORD},
    vocabulary::{Keyword, Vocabulary},
    Part,
};

/// A step-by-step schema builder for one vocabulary.
pub struct Builder {
    schema: Schema,
}

impl Builder {
    /// A builder producing schemas of the given vocabulary.
    pub fn new(vocabulary: Arc<Vocabulary>) -> Builder {
        Builder {
            schema: Schema::new(vocabulary),
        }
    }

    /// The `true` or `false` schema.
    pub fn bool_schema(vocabulary: Arc<Vocabulary>, accept_all: bool) -> Schema {
        let mut schema = Schema::new(vocabulary);
        schema.node_mut(NodeId::ROOT).parts.push(Part::new(
            Arc::clone(&BOOL_KEYWORD),
            Arg::Bool(accept_all),
        ));
        schema
    }

    /// Finalizes and returns the schema.
    pub fn build(mut self) -> Schema {
        let root = self.schema.root();
        self.schema.finalize(root);
        self.schema
    }

    fn check(keyword: &Keyword, want: ArgType) {
        if keyword.arg_type != want {
            panic!(
                "keyword {:?} expects a {} argument, got {}",
                keyword.name,
                keyword.arg_type.name(),
                want.name()
            );
        }
    }

    fn push(mut self, keyword: &Arc<Keyword>, value: Arg) -> Builder {
        self.schema
            .node_mut(NodeId::ROOT)
            .parts
            .push(Part::new(Arc::clone(keyword), value));
        self
    }

    /// Adds a keyword with a bool argument.
    pub fn add_bool(self, keyword: &Arc<Keyword>, value: bool) -> Builder {
        Self::check(keyword, ArgType::Bool);
        self.push(keyword, Arg::Bool(value))
    }

    /// Adds a keyword with a string argument. For a string-or-strings
    /// keyword this adds the single-string form.
    pub fn add_string(self, keyword: &Arc<Keyword>, value: &str) -> Builder {
        if keyword.arg_type == ArgType::StringOrStrings {
            return self.push(
                keyword,
                Arg::StringOrStrings(StringOrStrings::One(value.to_string())),
            );
        }
        Self::check(keyword, ArgType::String);
        self.push(keyword, Arg::String(value.to_string()))
    }

    /// Adds a keyword with a list-of-strings argument. For a
    /// string-or-strings keyword this adds the list form.
    pub fn add_strings(self, keyword: &Arc<Keyword>, values: Vec<String>) -> Builder {
        if keyword.arg_type == ArgType::StringOrStrings {
            return self.push(keyword, Arg::StringOrStrings(StringOrStrings::Many(values)));
        }
        Self::check(keyword, ArgType::Strings);
        self.push(keyword, Arg::Strings(values))
    }

    /// Adds a keyword with an integer argument.
    pub fn add_int(self, keyword: &Arc<Keyword>, value: i64) -> Builder {
        Self::check(keyword, ArgType::Int);
        self.push(keyword, Arg::Int(value))
    }

    /// Adds a keyword with a number argument.
    pub fn add_float(self, keyword: &Arc<Keyword>, value: f64) -> Builder {
        Self::check(keyword, ArgType::Float);
        self.push(keyword, Arg::Float(value))
    }

    /// Adds a keyword with a schema argument.
    pub fn add_schema(mut self, keyword: &Arc<Keyword>, sub: Schema) -> Builder {
        Self::check(keyword, ArgType::Schema);
        let id = self.schema.absorb(sub);
        self.push(keyword, Arg::Schema(id))
    }

    /// Adds a keyword with a list-of-schemas argument.
    pub fn add_schemas(mut self, keyword: &Arc<Keyword>, subs: Vec<Schema>) -> Builder {
        Self::check(keyword, ArgType::Schemas);
        let ids = subs.into_iter().map(|s| self.schema.absorb(s)).collect();
        self.push(keyword, Arg::Schemas(ids))
    }

    /// Adds a keyword with a map-of-schemas argument.
    pub fn add_map_schema(
        mut self,
        keyword: &Arc<Keyword>,
        entries: impl IntoIterator<Item = (String, Schema)>,
    ) -> Builder {
        Self::check(keyword, ArgType::MapSchema);
        let map: BTreeMap<String, NodeId> = entries
            .into_iter()
            .map(|(name, sub)| (name, self.schema.absorb(sub)))
            .collect();
        self.push(keyword, Arg::MapSchema(map))
    }

    /// Adds a keyword with an arbitrary JSON argument.
    pub fn add_any(self, keyword: &Arc<Keyword>, value: Value) -> Builder {
        Self::check(keyword, ArgType::Any);
        self.push(keyword, Arg::Any(value))
    }

    /// Splices in pre-assembled parts. This is the escape hatch for
    /// composing schemas and custom keywords; the parts must reference
    /// nothing outside this builder's schema.
    pub fn add_schema_parts(mut self, parts: Vec<Part>) -> Builder {
        self.schema.node_mut(NodeId::ROOT).parts.extend(parts);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft202012;
    use serde_json::json;

    #[test]
    fn typed_adds_build_a_working_schema() {
        let vocabulary = draft202012::vocabulary();
        let int = Builder::new(Arc::clone(&vocabulary))
            .add_string(vocabulary.keyword("type").unwrap(), "integer")
            .build();
        let schema = Builder::new(Arc::clone(&vocabulary))
            .add_map_schema(
                vocabulary.keyword("properties").unwrap(),
                [("n".to_string(), int)],
            )
            .add_strings(
                vocabulary.keyword("required").unwrap(),
                vec!["n".to_string()],
            )
            .build();

        assert!(schema.is_valid(&json!({"n": 1})));
        assert!(!schema.is_valid(&json!({"n": "x"})));
        assert!(!schema.is_valid(&json!({})));
    }

    #[test]
    fn bool_schemas_from_the_builder() {
        let vocabulary = draft202012::vocabulary();
        assert!(Builder::bool_schema(Arc::clone(&vocabulary), true).is_valid(&json!(1)));
        assert!(!Builder::bool_schema(vocabulary, false).is_valid(&json!(1)));
    }

    #[test]
    #[should_panic(expected = "expects")]
    fn shape_mismatch_panics() {
        let vocabulary = draft202012::vocabulary();
        let keyword = vocabulary.keyword("minLength").unwrap().clone();
        let _ = Builder::new(vocabulary).add_bool(&keyword, true);
    }
}
