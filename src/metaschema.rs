//! Embedded meta-schema documents.
//!
//! References to the draft meta-schemas resolve from data compiled into
//! the library, keyed by their `json-schema.org` path; the loader is
//! only consulted for everything else.

use fluent_uri::UriRef;

use crate::resolver::RefRules;

/// Returns the embedded meta-schema document for `uri`, when there is
/// one for the current draft.
pub(crate) fn lookup(rules: &RefRules, uri: &UriRef<String>) -> Option<&'static str> {
    let scheme = uri.scheme()?.as_str();
    if scheme != "http" && scheme != "https" {
        return None;
    }
    if uri.authority()?.host() != "json-schema.org" {
        return None;
    }
    let rest = uri.path().as_str().strip_prefix(rules.metaschema_prefix)?;
    rules
        .metaschemas
        .iter()
        .find(|(path, _)| *path == rest)
        .map(|(_, text)| *text)
}

#[cfg(test)]
mod tests {
    use crate::{draft202012, draft7, Schema};
    use serde_json::json;

    #[test]
    fn embedded_documents_parse() {
        let schema = Schema::from_value(&json!({
            "$ref": draft202012::SCHEMA_ID
        }))
        .unwrap();
        // The meta-schema accepts schema-shaped objects and booleans.
        assert!(schema.is_valid(&json!(true)));
        assert!(schema.is_valid(&json!({"type": "string"})));

        let schema = Schema::from_value(&json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "$ref": draft7::SCHEMA_ID
        }))
        .unwrap();
        assert!(schema.is_valid(&json!({"type": "integer"})));
    }
}
