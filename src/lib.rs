//! JSON Schema validation built on a normalized schema representation.
//!
//! A schema document is decoded into an ordered list of
//! `(keyword, argument)` parts per node, references are resolved once up
//! front by rewriting that representation, and validation interprets the
//! finalized parts against an instance. Draft 2020-12 is the default;
//! draft 7 is built in, and further drafts plug in as [`Vocabulary`]
//! values.
//!
//! # One-off validation
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! assert!(schemir::is_valid(&schema, &json!("hello")));
//! assert!(!schemir::is_valid(&schema, &json!(42)));
//! ```
//!
//! # Reusable schemas and error reports
//!
//! Parse once and validate many instances. Failures come back as the
//! flat "basic" output list, each error carrying JSON Pointers into the
//! schema and the instance:
//!
//! ```rust
//! use serde_json::json;
//! use schemir::{Error, Schema};
//!
//! let schema = Schema::from_value(&json!({
//!     "properties": {"name": {"type": "string"}},
//!     "required": ["name"]
//! }))
//! .unwrap();
//!
//! match schema.validate(&json!({"name": 123})) {
//!     Err(Error::Validation(errors)) => {
//!         let error = errors.iter().next().unwrap();
//!         assert_eq!(error.keyword_location, "#/properties/name/type");
//!         assert_eq!(error.instance_location, "#/name");
//!     }
//!     other => panic!("expected a validation failure, got {other:?}"),
//! }
//! ```
//!
//! # Remote references
//!
//! `$ref` to other documents goes through a [`Loader`], either set
//! globally with [`set_loader`] or per resolve call via
//! [`ResolveOpts`]. The meta-schemas of the built-in drafts are served
//! from embedded data and need no loader.
//!
//! # Building schemas in code
//!
//! ```rust
//! use serde_json::json;
//! use schemir::draft202012::Builder;
//!
//! let schema = Builder::new()
//!     .add_type("integer")
//!     .add_minimum(0.0)
//!     .build();
//! assert!(schema.is_valid(&json!(7)));
//! ```

pub mod arg;
mod builder;
mod defaults;
pub mod draft202012;
pub mod draft7;
mod error;
pub mod formats;
mod helpers;
mod json;
pub mod keywords;
mod metaschema;
mod notes;
mod pointer;
mod resolver;
mod schema;
mod state;
mod uri;
mod vocabulary;

pub use arg::{AnchorArg, Arg, ArgType, ArrayOrSchema, SchemaOrSchemas, StringOrStrings};
pub use builder::Builder;
pub use error::{Error, EvalError, SchemaError, ValidationError, ValidationErrors};
pub use notes::{ItemsNote, Notes, NoteValue, PrefixNote, PropertyNote};
pub use resolver::{set_loader, Loader, ResolveOpts};
pub use schema::{NodeId, Part, Schema, BOOL_KEYWORD, SCHEMA_KEYWORD};
pub use state::{ValidateOpts, ValidationState, MAX_DEPTH};
pub use vocabulary::{
    default_vocabulary, lookup_vocabulary, register_vocabulary, set_default_schema, Keyword,
    KeywordSpec, ResolveFn, ValidateFn, Vocabulary,
};

use serde_json::Value;

/// Reports whether `instance` satisfies `schema`, with `format` checking
/// enabled. For validating many instances against one schema, parse the
/// schema once with [`Schema::from_value`] instead.
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    match Schema::from_value(schema) {
        Ok(schema) => schema.is_valid(instance),
        Err(_) => false,
    }
}

/// Validates `instance` against `schema` once, returning the full error
/// report.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), Error> {
    Schema::from_value(schema)
        .map_err(Error::Schema)?
        .validate(instance)
}
