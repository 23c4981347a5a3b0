//! Error types.
//!
//! Validation keeps two disjoint channels apart. A [`ValidationError`] is
//! an instance failing a schema: these accumulate so the final report is a
//! complete list. A [`SchemaError`] is a problem with the schema itself
//! (malformed document, unresolved reference, loader failure, recursion
//! limit): these are fatal and terminate the operation immediately.

use std::{error, fmt};

use serde::Serialize;

/// A single failure in the "basic" JSON Schema output format.
///
/// Locations are RFC 6901 JSON Pointers prefixed with `#`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Human-readable description of the failure.
    #[serde(rename = "error")]
    pub message: String,
    /// Pointer to the keyword that failed, e.g. `#/properties/name/type`.
    #[serde(rename = "keywordLocation")]
    pub keyword_location: String,
    /// Pointer to the instance value that failed, e.g. `#/name`.
    #[serde(rename = "instanceLocation")]
    pub instance_location: String,
}

impl ValidationError {
    /// A new error with empty locations. The evaluator stamps locations
    /// while the error propagates outward.
    pub fn new(message: impl Into<String>) -> ValidationError {
        ValidationError {
            message: message.into(),
            keyword_location: String::new(),
            instance_location: String::new(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc = if self.keyword_location.is_empty() {
            "#"
        } else {
            &self.keyword_location
        };
        write!(f, "{loc}: {}", self.message)
    }
}

impl error::Error for ValidationError {}

/// A collection of [`ValidationError`] values.
///
/// Serializes as the flat error list of the basic output format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub(crate) fn single(error: ValidationError) -> ValidationErrors {
        ValidationErrors {
            errors: vec![error],
        }
    }

    pub(crate) fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// Iterates over the individual errors.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Reports whether any error already carries a keyword or instance
    /// location. Errors without locations get the current keyword name
    /// prefixed by the part loop; located errors are attached unchanged.
    pub(crate) fn has_location(&self) -> bool {
        self.errors
            .iter()
            .any(|e| !e.keyword_location.is_empty() || !e.instance_location.is_empty())
    }

    /// Prefixes `loc` into every keyword location and normalizes empty
    /// instance locations to `#`.
    pub(crate) fn prefix(&mut self, loc: &str) {
        for e in &mut self.errors {
            e.keyword_location = compose_pointer(loc, &e.keyword_location);
            if e.instance_location.is_empty() {
                e.instance_location = "#".to_string();
            }
        }
    }

    /// Stamps `ptr` onto errors whose instance location is still unset.
    pub(crate) fn ensure_instance_location(&mut self, ptr: &str) {
        for e in &mut self.errors {
            if e.instance_location.is_empty() || e.instance_location == "#" {
                e.instance_location = ptr.to_string();
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// A problem with a schema, as opposed to an instance failing validation.
#[derive(Debug)]
pub enum SchemaError {
    /// The schema document is not valid JSON.
    Json(serde_json::Error),
    /// The document shape cannot be a schema, or a keyword argument does
    /// not match its declared type.
    InvalidKeyword { keyword: String, reason: String },
    /// `$schema` names a vocabulary that is not registered.
    UnknownVocabulary { schema: String },
    /// No `$schema` and no default vocabulary registered.
    NoDefaultVocabulary,
    /// A URI failed to parse or resolve.
    InvalidUri { uri: String, reason: String },
    /// `$id` carries a fragment where none is allowed.
    IdWithFragment { id: String, location: String },
    /// The same anchor name registered twice under one base URI.
    DuplicateAnchor { anchor: String, location: String },
    /// More than one `$ref` (or `$dynamicRef`, or `$dynamicAnchor`) in a
    /// single schema node.
    DuplicateKeyword { keyword: String, location: String },
    /// A reference that could not be resolved.
    UnresolvedRef { reference: String, location: String },
    /// JSON Pointer navigation failed.
    Pointer { pointer: String, reason: String },
    /// A reference required remote loading but no loader is configured.
    LoadNotPermitted { uri: String, location: String },
    /// The loader failed, or returned nothing.
    Load { uri: String, reason: String },
    /// Validation recursed deeper than the hard limit; the schema graph
    /// is cyclic or pathologically nested.
    RecursionLimit,
    /// A malformed schema detected after resolution, e.g. an argument
    /// whose runtime shape contradicts its keyword.
    Malformed { reason: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Json(e) => write!(f, "invalid JSON: {e}"),
            SchemaError::InvalidKeyword { keyword, reason } => {
                write!(f, "{keyword:?}: {reason}")
            }
            SchemaError::UnknownVocabulary { schema } => {
                write!(f, "JSON schema version {schema:?} not recognized")
            }
            SchemaError::NoDefaultVocabulary => {
                write!(f, "JSON schema version not specified and there is no default")
            }
            SchemaError::InvalidUri { uri, reason } => {
                write!(f, "invalid URI {uri:?}: {reason}")
            }
            SchemaError::IdWithFragment { id, location } => {
                write!(f, "{location}: \"$id\" {id:?} contains non-empty fragment")
            }
            SchemaError::DuplicateAnchor { anchor, location } => {
                write!(f, "{location}: duplicate anchor {anchor:?}")
            }
            SchemaError::DuplicateKeyword { keyword, location } => {
                write!(f, "{location}: more than one {keyword}")
            }
            SchemaError::UnresolvedRef {
                reference,
                location,
            } => {
                write!(f, "{location}: could not resolve reference {reference:?}")
            }
            SchemaError::Pointer { pointer, reason } => {
                write!(f, "dereferencing pointer {pointer:?}: {reason}")
            }
            SchemaError::LoadNotPermitted { uri, location } => {
                write!(f, "{location}: remote loading of URI {uri:?} not permitted")
            }
            SchemaError::Load { uri, reason } => {
                write!(f, "loading of URI {uri:?} failed: {reason}")
            }
            SchemaError::RecursionLimit => {
                write!(f, "recursion while validating schema too deep")
            }
            SchemaError::Malformed { reason } => write!(f, "malformed schema: {reason}"),
        }
    }
}

impl error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            SchemaError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(e: serde_json::Error) -> SchemaError {
        SchemaError::Json(e)
    }
}

/// The result channel of keyword validators: either accumulated instance
/// failures or a fatal schema problem that short-circuits everything.
#[derive(Debug)]
pub enum EvalError {
    Invalid(ValidationErrors),
    Fatal(SchemaError),
}

impl EvalError {
    /// A single validation failure with empty locations.
    pub fn fail(message: impl Into<String>) -> EvalError {
        EvalError::Invalid(ValidationErrors::single(ValidationError::new(message)))
    }

    /// Reports whether this is an instance failure rather than a fatal
    /// schema problem. Conditional keywords swallow only the former.
    pub fn is_validation(&self) -> bool {
        matches!(self, EvalError::Invalid(_))
    }
}

impl From<SchemaError> for EvalError {
    fn from(e: SchemaError) -> EvalError {
        EvalError::Fatal(e)
    }
}

/// The error of a top-level validate call.
#[derive(Debug)]
pub enum Error {
    /// The schema itself is unusable.
    Schema(SchemaError),
    /// The instance does not conform; all collected failures.
    Validation(ValidationErrors),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema(e) => e.fmt(f),
            Error::Validation(e) => e.fmt(f),
        }
    }
}

impl error::Error for Error {}

/// Folds `err` into `acc`, prefixing `loc` into keyword locations of
/// validation errors. A fatal error displaces any accumulated validation
/// errors; the first fatal error wins.
pub(crate) fn add_error(acc: &mut Option<EvalError>, err: EvalError, loc: &str) {
    match err {
        EvalError::Fatal(e) => {
            if !matches!(acc, Some(EvalError::Fatal(_))) {
                *acc = Some(EvalError::Fatal(e));
            }
        }
        EvalError::Invalid(mut errs) => {
            errs.prefix(loc);
            match acc {
                None => *acc = Some(EvalError::Invalid(errs)),
                Some(EvalError::Invalid(existing)) => existing.extend(errs),
                Some(EvalError::Fatal(_)) => {}
            }
        }
    }
}

/// Stamps `ptr` onto validation errors that carry no instance location.
pub(crate) fn ensure_instance_location(err: EvalError, ptr: &str) -> EvalError {
    match err {
        EvalError::Invalid(mut errs) => {
            errs.ensure_instance_location(ptr);
            EvalError::Invalid(errs)
        }
        fatal => fatal,
    }
}

/// Prefixes `loc` onto an existing `#`-prefixed keyword pointer.
fn compose_pointer(loc: &str, existing: &str) -> String {
    let tail = if let Some(t) = existing.strip_prefix("#/") {
        t
    } else if let Some(t) = existing.strip_prefix('#') {
        t
    } else {
        existing
    };
    match (loc.is_empty(), tail.is_empty()) {
        (true, true) => "#".to_string(),
        (true, false) => format!("#/{tail}"),
        (false, true) => format!("#/{loc}"),
        (false, false) => format!("#/{loc}/{tail}"),
    }
}

/// Escapes one RFC 6901 reference token.
pub(crate) fn escape_token(tok: &str) -> String {
    if tok.contains(['~', '/']) {
        tok.replace('~', "~0").replace('/', "~1")
    } else {
        tok.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_rules() {
        assert_eq!(compose_pointer("", ""), "#");
        assert_eq!(compose_pointer("", "#/type"), "#/type");
        assert_eq!(compose_pointer("required/name", ""), "#/required/name");
        assert_eq!(
            compose_pointer("properties/name", "#/type"),
            "#/properties/name/type"
        );
        assert_eq!(compose_pointer("allOf/0", "#"), "#/allOf/0");
    }

    #[test]
    fn fatal_error_displaces_validation_errors() {
        let mut acc = None;
        add_error(&mut acc, EvalError::fail("nope"), "type");
        add_error(&mut acc, EvalError::Fatal(SchemaError::RecursionLimit), "");
        add_error(&mut acc, EvalError::fail("later"), "enum");
        assert!(matches!(acc, Some(EvalError::Fatal(_))));
    }

    #[test]
    fn display_renders_location_and_message() {
        let mut errs = ValidationErrors::single(ValidationError::new("bad type"));
        errs.prefix("type");
        assert_eq!(errs.to_string(), "#/type: bad type");
    }

    #[test]
    fn token_escaping() {
        assert_eq!(escape_token("a/b"), "a~1b");
        assert_eq!(escape_token("a~b"), "a~0b");
        assert_eq!(escape_token("plain"), "plain");
    }
}
