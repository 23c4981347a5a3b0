//! JSON Schema draft 7.
//!
//! The earlier-draft vocabulary: `definitions` instead of `$defs`, the
//! schema-or-list form of `items` with `additionalItems`, the combined
//! `dependencies` keyword, and plain-name `$id` fragments as anchors.
//! No dynamic anchors and no evaluation-tracking keywords. Validator
//! behaviour is shared with 2020-12 wherever the keywords coincide.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::{
    arg::ArgType,
    builder,
    error::SchemaError,
    formats,
    keywords::{array, basic, combinators, conditional, legacy, numeric, object, references, string},
    resolver::{self, RefRules, ResolveOpts},
    schema::Schema,
    vocabulary::{Keyword, KeywordSpec, Vocabulary},
};

/// The URI identifying draft 7 (without the customary trailing `#`).
pub const SCHEMA_ID: &str = "http://json-schema.org/draft-07/schema";

static METASCHEMAS: &[(&str, &str)] = &[("schema", include_str!("metaschema/schema.json"))];

static RULES: RefRules = RefRules {
    schema_id: SCHEMA_ID,
    dynamic: false,
    id_fragment_anchors: true,
    metaschema_prefix: "/draft-07/",
    metaschemas: METASCHEMAS,
};

fn resolve(schema: &mut Schema, opts: &ResolveOpts) -> Result<(), SchemaError> {
    resolver::resolve_schema(schema, opts, &RULES)
}

fn build_vocabulary() -> Arc<Vocabulary> {
    let mut specs = Vec::new();
    let mut add = |keyword: Arc<Keyword>| specs.push(KeywordSpec::new(keyword));

    // Core.
    add(Keyword::annotation("$id", ArgType::String));
    add(Keyword::new("$ref", ArgType::String, references::validate_ref));
    add(Keyword::annotation("$comment", ArgType::String));
    add(Keyword::annotation("definitions", ArgType::MapSchema));

    // Applicators.
    add(Keyword::new("allOf", ArgType::Schemas, combinators::validate_all_of));
    add(Keyword::new("anyOf", ArgType::Schemas, combinators::validate_any_of));
    add(Keyword::new("oneOf", ArgType::Schemas, combinators::validate_one_of));
    add(Keyword::new("not", ArgType::Schema, combinators::validate_not));
    add(Keyword::new("if", ArgType::Schema, conditional::validate_if));
    add(Keyword::new(
        "items",
        ArgType::SchemaOrSchemas,
        legacy::validate_items_pre2020,
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
    add(Keyword::new(
        "dependencies",
        ArgType::MapArrayOrSchema,
        object::validate_dependencies,
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

    // Format, content, meta-data.
    add(Keyword::new("format", ArgType::String, formats::validate_format));
    add(Keyword::annotation("contentEncoding", ArgType::String));
    add(Keyword::annotation("contentMediaType", ArgType::String));
    add(Keyword::annotation("title", ArgType::String));
    add(Keyword::annotation("description", ArgType::String));
    add(Keyword::annotation("default", ArgType::Any));
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
        Keyword::new(
            "additionalItems",
            ArgType::Schema,
            legacy::validate_additional_items,
        ),
        &["items"],
    ));
    specs.push(KeywordSpec::after(
        Keyword::new(
            "additionalProperties",
            ArgType::Schema,
            object::validate_additional_properties,
        ),
        &["properties", "patternProperties"],
    ));

    Vocabulary::new("draft7", SCHEMA_ID, specs, resolve)
}

static VOCABULARY: Lazy<Arc<Vocabulary>> = Lazy::new(build_vocabulary);

/// The draft 7 vocabulary.
pub fn vocabulary() -> Arc<Vocabulary> {
    Arc::clone(&VOCABULARY)
}

fn kw(name: &str) -> Arc<Keyword> {
    Arc::clone(VOCABULARY.keyword(name).expect("keyword is registered"))
}

/// A draft 7 schema builder covering the common keywords; anything else
/// goes through the generic [`builder::Builder`].
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

    pub fn add_type(self, name: &str) -> Builder {
        Builder {
            inner: self.inner.add_string(&kw("type"), name),
        }
    }

    pub fn add_types(self, names: &[&str]) -> Builder {
        Builder {
            inner: self
                .inner
                .add_strings(&kw("type"), names.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn add_enum(self, options: serde_json::Value) -> Builder {
        Builder {
            inner: self.inner.add_any(&kw("enum"), options),
        }
    }

    pub fn add_const(self, value: serde_json::Value) -> Builder {
        Builder {
            inner: self.inner.add_any(&kw("const"), value),
        }
    }

    pub fn add_minimum(self, value: f64) -> Builder {
        Builder {
            inner: self.inner.add_float(&kw("minimum"), value),
        }
    }

    pub fn add_maximum(self, value: f64) -> Builder {
        Builder {
            inner: self.inner.add_float(&kw("maximum"), value),
        }
    }

    pub fn add_min_length(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("minLength"), value),
        }
    }

    pub fn add_max_length(self, value: i64) -> Builder {
        Builder {
            inner: self.inner.add_int(&kw("maxLength"), value),
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

    pub fn add_properties(
        self,
        entries: impl IntoIterator<Item = (String, Schema)>,
    ) -> Builder {
        Builder {
            inner: self.inner.add_map_schema(&kw("properties"), entries),
        }
    }

    pub fn add_additional_properties(self, sub: Schema) -> Builder {
        Builder {
            inner: self.inner.add_schema(&kw("additionalProperties"), sub),
        }
    }

    pub fn add_required(self, names: Vec<String>) -> Builder {
        Builder {
            inner: self.inner.add_strings(&kw("required"), names),
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

    pub fn add_default(self, value: serde_json::Value) -> Builder {
        Builder {
            inner: self.inner.add_any(&kw("default"), value),
        }
    }
}
