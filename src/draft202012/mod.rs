//! JSON Schema draft 2020-12.
//!
//! Assembles the draft's vocabulary: the full keyword table with its
//! ordering constraints, the resolver configuration (dynamic anchors,
//! embedded meta-schemas), and a typed [`Builder`].

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{
    arg::ArgType,
    builder,
    error::SchemaError,
    formats,
    keywords::{array, basic, combinators, conditional, numeric, object, references, string},
    resolver::{self, RefRules, ResolveOpts},
    schema::Schema,
    vocabulary::{Keyword, KeywordSpec, Vocabulary},
};

/// The URI identifying draft 2020-12.
pub const SCHEMA_ID: &str = "https://json-schema.org/draft/2020-12/schema";

static METASCHEMAS: &[(&str, &str)] = &[
    ("schema", include_str!("metaschema/schema.json")),
    ("meta/core", include_str!("metaschema/meta/core.json")),
    ("meta/applicator", include_str!("metaschema/meta/applicator.json")),
    ("meta/validation", include_str!("metaschema/meta/validation.json")),
    ("meta/unevaluated", include_str!("metaschema/meta/unevaluated.json")),
    ("meta/meta-data", include_str!("metaschema/meta/meta-data.json")),
    (
        "meta/format-annotation",
        include_str!("metaschema/meta/format-annotation.json"),
    ),
    ("meta/content", include_str!("metaschema/meta/content.json")),
];

static RULES: RefRules = RefRules {
    schema_id: SCHEMA_ID,
    dynamic: true,
    id_fragment_anchors: false,
    metaschema_prefix: "/draft/2020-12/",
    metaschemas: METASCHEMAS,
};

fn resolve(schema: &mut Schema, opts: &ResolveOpts) -> Result<(), SchemaError> {
    resolver::resolve_schema(schema, opts, &RULES)
}

// The annotation-consuming keywords run after everything whose notes
// they read, including the in-place applicators that merge notes upward.
static UNEVALUATED_ITEMS_AFTER: &[&str] = &[
    "prefixItems",
    "items",
    "contains",
    "$ref",
    "$dynamicRef",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
    "dependentSchemas",
];

static UNEVALUATED_PROPERTIES_AFTER: &[&str] = &[
    "properties",
    "patternProperties",
    "additionalProperties",
    "$ref",
    "$dynamicRef",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
    "dependentSchemas",
];

fn build_vocabulary() -> Arc<Vocabulary> {
    let mut specs = Vec::new();
    let mut add = |keyword: Arc<Keyword>| specs.push(KeywordSpec::new(keyword));

    // Core.
    add(Keyword::annotation("$id", ArgType::String));
    add(Keyword::annotation("$anchor", ArgType::String));
    add(Keyword::annotation("$dynamicAnchor", ArgType::String));
    add(Keyword::new("$ref", ArgType::String, references::validate_ref));
    add(Keyword::new(
        "$dynamicRef",
        ArgType::String,
        references::validate_dynamic_ref,
    ));
    add(Keyword::annotation("$vocabulary", ArgType::Any));
    add(Keyword::annotation("$comment", ArgType::String));
    add(Keyword::annotation("$defs", ArgType::MapSchema));

    // Applicators.
    add(Keyword::new("allOf", ArgType::Schemas, combinators::validate_all_of));
    add(Keyword::new("anyOf", ArgType::Schemas, combinators::validate_any_of));
    add(Keyword::new("oneOf", ArgType::Schemas, combinators::validate_one_of));
    add(Keyword::new("not", ArgType::Schema, combinators::validate_not));
    add(Keyword::new("if", ArgType::Schema, conditional::validate_if));
    add(Keyword::new(
        "dependentSchemas",
        ArgType::MapSchema,
        object::validate_dependent_schemas,
    ));
    add(Keyword::new(
        "prefixItems",
        ArgType::Schemas,
        array::validate_prefix_items,
    ));
    add(Keyword::new("contains", ArgType::Schema, array::validate_contains));
    add(Keyword::new(
        "properties",
        ArgType::MapSchema,
        object::validate_properties,
    ));
    add(Keyword::new(
        "patternProperties",
        ArgType::MapSchema,
        object::validate_pattern_properties,
    ));
    add(Keyword::new(
        "propertyNames",
        ArgType::Schema,
        object::validate_property_names,
    ));

    // Validation.
    add(Keyword::new("type", ArgType::StringOrStrings, basic::validate_type));
    add(Keyword::new("enum", ArgType::Any, basic::validate_enum));
    add(Keyword::new("const", ArgType::Any, basic::validate_const));
    add(Keyword::new(
        "multipleOf",
        ArgType::Float,
        numeric::validate_multiple_of,
    ));
    add(Keyword::new("maximum", ArgType::Float, numeric::validate_maximum));
    add(Keyword::new(
        "exclusiveMaximum",
        ArgType::Float,
        numeric::validate_exclusive_maximum,
    ));
    add(Keyword::new("minimum", ArgType::Float, numeric::validate_minimum));
    add(Keyword::new(
        "exclusiveMinimum",
        ArgType::Float,
        numeric::validate_exclusive_minimum,
    ));
    add(Keyword::new("maxLength", ArgType::Int, string::validate_max_length));
    add(Keyword::new("minLength", ArgType::Int, string::validate_min_length));
    add(Keyword::new("pattern", ArgType::String, string::validate_pattern));
    add(Keyword::new("maxItems", ArgType::Int, array::validate_max_items));
    add(Keyword::new("minItems", ArgType::Int, array::validate_min_items));
    add(Keyword::new(
        "uniqueItems",
        ArgType::Bool,
        array::validate_unique_items,
    ));
    add(Keyword::new(
        "maxProperties",
        ArgType::Int,
        object::validate_max_properties,
    ));
    add(Keyword::new(
        "minProperties",
        ArgType::Int,
        object::validate_min_properties,
    ));
    add(Keyword::new("required", ArgType::Strings, object::validate_required));
    add(Keyword::new(
        "dependentRequired",
        ArgType::Any,
        object::validate_dependent_required,
    ));
    // Kept from draft 7 as an optional extra.
    add(Keyword::new(
        "dependencies",
        ArgType::MapArrayOrSchema,
        object::validate_dependencies,
    ));

    // Format and content.
    add(Keyword::new("format", ArgType::String, formats::validate_format));
    add(Keyword::annotation("contentEncoding", ArgType::String));
    add(Keyword::annotation("contentMediaType", ArgType::String));
    add(Keyword::annotation("contentSchema", ArgType::Schema));

    // Meta-data.
    add(Keyword::annotation("title", ArgType::String));
    add(Keyword::annotation("description", ArgType::String));
    add(Keyword::annotation("default", ArgType::Any));
    add(Keyword::annotation("deprecated", ArgType::Bool));
    add(Keyword::annotation("readOnly", ArgType::Bool));
    add(Keyword::annotation("writeOnly", ArgType::Bool));
    add(Keyword::annotation("examples", ArgType::Any));

    // Ordering-constrained keywords.
    specs.push(KeywordSpec::after(
        Keyword::new("then", ArgType::Schema, conditional::validate_then),
        &["if"],
    ));
    specs.push(KeywordSpec::after(
        Keyword::new("else", ArgType::Schema, conditional::validate_else),
        &["if"],
    ));
    specs.push(KeywordSpec::after(
        Keyword::new("items", ArgType::Schema, array::validate_items),
        &["prefixItems"],
    ));
    specs.push(KeywordSpec::after(
        Keyword::new(
            "additionalProperties",
            ArgType::Schema,
            object::validate_additional_properties,
        ),
        &["properties", "patternProperties"],
    ));
    specs.push(KeywordSpec::after(
        Keyword::new("maxContains", ArgType::Int, array::validate_max_contains),
        &["contains"],
    ));
    specs.push(KeywordSpec::after(
        Keyword::new("minContains", ArgType::Int, array::validate_min_contains),
        &["contains"],
    ));
    specs.push(KeywordSpec::after(
        Keyword::new(
            "unevaluatedItems",
            ArgType::Schema,
            crate::keywords::unevaluated::validate_unevaluated_items,
        ),
        UNEVALUATED_ITEMS_AFTER,
    ));
    specs.push(KeywordSpec::after(
        Keyword::new(
            "unevaluatedProperties",
            ArgType::Schema,
            crate::keywords::unevaluated::validate_unevaluated_properties,
        ),
        UNEVALUATED_PROPERTIES_AFTER,
    ));

    Vocabulary::new("draft2020-12", SCHEMA_ID, specs, resolve)
}

static VOCABULARY: Lazy<Arc<Vocabulary>> = Lazy::new(build_vocabulary);

/// The draft 2020-12 vocabulary.
pub fn vocabulary() -> Arc<Vocabulary> {
    Arc::clone(&VOCABULARY)
}

fn kw(name: &str) -> Arc<Keyword> {
    Arc::clone(VOCABULARY.keyword(name).expect("keyword is registered"))
}

/// A draft 2020-12 schema builder with a typed method per keyword.
///
/// Like the generic [`builder::Builder`] it wraps, it cannot express
/// reference keywords or anchors.
pub struct Builder {
    inner: builder::Builder,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

impl Builder {
    /// A builder for a standalone schema; records `$schema`.
    pub fn new() -> Builder {
        Builder {
            inner: builder::Builder::new(vocabulary())
                .add_string(&crate::schema::SCHEMA_KEYWORD, SCHEMA_ID),
        }
    }

    /// A builder for a schema that will be part of a larger one.
    pub fn new_sub() -> Builder {
        Builder {
            inner: builder::Builder::new(vocabulary()),
        }
    }

    /// The `true` or `false` schema.
    pub fn bool_schema(accept_all: bool) -> Schema {
        builder::Builder::bool_schema(vocabulary(), accept_all)
    }

    /// Finalizes and returns the schema.
    pub fn build(self) -> Schema {
        self.inner.build()
    }

    /// Splices in pre-assembled parts.
    pub fn add_schema_parts(self, parts: Vec<crate::Part>) -> Builder {
        Builder {
            inner: self.inner.add_schema_parts(parts),
        }
    }

    /// Adds the type keyword with a single type.
    pub fn add_type(self, name: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("type"), name),
        }
    }

    /// Adds the type keyword with a set of types.
    pub fn add_types(self, names: &[&str]) -> Builder {
        Builder {
            inner: self
                .inner
                .add_strings(&kw("type"), names.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn add_enum(self, options: Value) -> Builder {
        Builder {
            inner: self.inner.add_any(&kw("enum"), options),
        }
    }

    pub fn add_const(self, value: Value) -> Builder {
        Builder {
            inner: self.inner.add_any(&kw("const"), value),
        }
    }

    pub fn add_multiple_of(self, value: f64) -> Builder {
        Builder {
            inner: self.inner.add_float(&kw("multipleOf"), value),
        }
    }

    pub fn add_maximum(self, value: f64) -> Builder {
        Builder {
            inner: self.inner.add_float(&kw("maximum"), value),
        }
    }

    pub fn add_exclusive_maximum(self, value: f64) -> Builder {
        Builder {
            inner: self.inner.add_float(&kw("exclusiveMaximum"), value),
        }
    }

    pub fn add_minimum(self, value: f64) -> Builder {
        Builder {
            inner: self.inner.add_float(&kw("minimum"), value),
        }
    }

    pub fn add_exclusive_minimum(self, value: f64) -> Builder {
        Builder {
            inner: self.inner.add_float(&kw("exclusiveMinimum"), value),
        }
    }

    pub fn add_max_length(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("maxLength"), value),
        }
    }

    pub fn add_min_length(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("minLength"), value),
        }
    }

    pub fn add_pattern(self, pattern: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("pattern"), pattern),
        }
    }

    pub fn add_format(self, format: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("format"), format),
        }
    }

    pub fn add_max_items(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("maxItems"), value),
        }
    }

    pub fn add_min_items(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("minItems"), value),
        }
    }

    pub fn add_unique_items(self, unique: bool) -> Builder {
        Builder {
            inner: self.inner.add_bool(&kw("uniqueItems"), unique),
        }
    }

    pub fn add_max_contains(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("maxContains"), value),
        }
    }

    pub fn add_min_contains(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("minContains"), value),
        }
    }

    pub fn add_max_properties(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("maxProperties"), value),
        }
    }

    pub fn add_min_properties(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("minProperties"), value),
        }
    }

    pub fn add_required(self, names: Vec<String>) -> Builder {
        Builder {
            inner: self.inner.add_strings(&kw("required"), names),
        }
    }

    pub fn add_dependent_required(self, dependencies: Value) -> Builder {
        Builder {
            inner: self.inner.add_any(&kw("dependentRequired"), dependencies),
        }
    }

    pub fn add_all_of(self, subs: Vec<Schema>) -> Builder {
        Builder {
            inner: self.inner.add_schemas(&kw("allOf"), subs),
        }
    }

    pub fn add_any_of(self, subs: Vec<Schema>) -> Builder {
        Builder {
            inner: self.inner.add_schemas(&kw("anyOf"), subs),
        }
    }

    pub fn add_one_of(self, subs: Vec<Schema>) -> Builder {
        Builder {
            inner: self.inner.add_schemas(&kw("oneOf"), subs),
        }
    }

    pub fn add_not(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("not"), sub),
        }
    }

    pub fn add_if(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("if"), sub),
        }
    }

    pub fn add_then(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("then"), sub),
        }
    }

    pub fn add_else(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("else"), sub),
        }
    }

    pub fn add_dependent_schemas(
        self,
        entries: impl IntoIterator<Item = (String, Schema)>,
    ) -> Builder {
        Builder {
            inner: self.inner.add_map_schema(&kw("dependentSchemas"), entries),
        }
    }

    pub fn add_prefix_items(self, subs: Vec<Schema>) -> Builder {
        Builder {
            inner: self.inner.add_schemas(&kw("prefixItems"), subs),
        }
    }

    pub fn add_items(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("items"), sub),
        }
    }

    pub fn add_contains(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("contains"), sub),
        }
    }

    pub fn add_properties(self, entries: impl IntoIterator<Item = (String, Schema)>) -> Builder {
        Builder {
            inner: self.inner.add_map_schema(&kw("properties"), entries),
        }
    }

    pub fn add_pattern_properties(
        self,
        entries: impl IntoIterator<Item = (String, Schema)>,
    ) -> Builder {
        Builder {
            inner: self.inner.add_map_schema(&kw("patternProperties"), entries),
        }
    }

    pub fn add_additional_properties(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("additionalProperties"), sub),
        }
    }

    pub fn add_property_names(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("propertyNames"), sub),
        }
    }

    pub fn add_unevaluated_items(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("unevaluatedItems"), sub),
        }
    }

    pub fn add_unevaluated_properties(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("unevaluatedProperties"), sub),
        }
    }

    pub fn add_title(self, title: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("title"), title),
        }
    }

    pub fn add_description(self, description: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("description"), description),
        }
    }

    pub fn add_default(self, value: Value) -> Builder {
        Builder {
            inner: self.inner.add_any(&kw("default"), value),
        }
    }

    pub fn add_deprecated(self, deprecated: bool) -> Builder {
        Builder {
            inner: self.inner.add_bool(&kw("deprecated"), deprecated),
        }
    }

    pub fn add_read_only(self, read_only: bool) -> Builder {
        Builder {
            inner: self.inner.add_bool(&kw("readOnly"), read_only),
        }
    }

    pub fn add_write_only(self, write_only: bool) -> Builder {
        Builder {
            inner: self.inner.add_bool(&kw("writeOnly"), write_only),
        }
    }

    pub fn add_examples(self, examples: Value) -> Builder {
        Builder {
            inner: self.inner.add_any(&kw("examples"), examples),
        }
    }

    pub fn add_comment(self, comment: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("$comment"), comment),
        }
    }

    pub fn add_content_encoding(self, encoding: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("contentEncoding"), encoding),
        }
    }

    pub fn add_content_media_type(self, media_type: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("contentMediaType"), media_type),
        }
    }

    pub fn add_content_schema(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("contentSchema"), sub),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_output_matches_decoded_schema() {
        let built = Builder::new()
            .add_type("object")
            .add_properties([(
                "age".to_string(),
                Builder::new_sub()
                    .add_type("integer")
                    .add_minimum(0.0)
                    .build(),
            )])
            .add_required(vec!["age".to_string()])
            .build();

        let decoded = Schema::from_value(&json!({
            "$schema": SCHEMA_ID,
            "type": "object",
            "properties": {"age": {"type": "integer", "minimum": 0}},
            "required": ["age"]
        }))
        .unwrap();

        for instance in [
            json!({"age": 30}),
            json!({"age": -1}),
            json!({"age": "x"}),
            json!({}),
            json!("not an object"),
        ] {
            assert_eq!(built.is_valid(&instance), decoded.is_valid(&instance));
        }
    }

    #[test]
    fn conditional_ordering_holds_in_built_schemas() {
        let built = Builder::new()
            .add_else(Builder::bool_schema(false))
            .add_if(Builder::new_sub().add_type("integer").build())
            .build();
        assert!(built.is_valid(&json!(3)));
        assert!(!built.is_valid(&json!("s")));
    }
}
