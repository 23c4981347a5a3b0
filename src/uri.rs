//! Thin helpers over `fluent-uri`.

use fluent_uri::{Uri, UriRef};

use crate::error::SchemaError;

fn invalid(uri: &str, reason: impl ToString) -> SchemaError {
    SchemaError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses a URI reference (RFC 3986) and normalizes it.
pub(crate) fn from_str(uri: &str) -> Result<UriRef<String>, SchemaError> {
    Ok(UriRef::parse(uri)
        .map_err(|e| invalid(uri, e))?
        .normalize())
}

/// Resolves `uri` against `base` and normalizes the result. `base` must
/// be absolute.
pub(crate) fn resolve_against(
    base: &UriRef<String>,
    uri: &str,
) -> Result<UriRef<String>, SchemaError> {
    let base = Uri::try_from(base.borrow()).map_err(|e| invalid(base.as_str(), e))?;
    Ok(UriRef::parse(uri)
        .map_err(|e| invalid(uri, e))?
        .resolve_against(&base)
        .map_err(|e| invalid(uri, e))?
        .normalize()
        .into())
}

/// The fragment with percent-encoding decoded.
pub(crate) fn fragment_decoded(uri: &UriRef<String>) -> Option<String> {
    uri.fragment()
        .map(|f| f.decode().into_string_lossy().into_owned())
}

/// Everything before the fragment.
pub(crate) fn without_fragment(uri: &UriRef<String>) -> &str {
    let s = uri.as_str();
    match s.split_once('#') {
        Some((head, _)) => head,
        None => s,
    }
}

/// Reports whether the reference carries a scheme.
pub(crate) fn is_absolute(uri: &UriRef<String>) -> bool {
    uri.scheme().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_follows_the_base() {
        let base = from_str("https://example.com/root/schema.json").unwrap();
        let resolved = resolve_against(&base, "other.json#frag").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/root/other.json#frag");
        assert_eq!(fragment_decoded(&resolved).as_deref(), Some("frag"));
        assert_eq!(without_fragment(&resolved), "https://example.com/root/other.json");
    }

    #[test]
    fn absolute_reference_ignores_the_base() {
        let base = from_str("https://example.com/a").unwrap();
        let resolved = resolve_against(&base, "https://other.test/b").unwrap();
        assert_eq!(resolved.as_str(), "https://other.test/b");
    }

    #[test]
    fn pointer_fragments_decode() {
        let uri = from_str("https://example.com/x#/%24defs/S").unwrap();
        assert_eq!(fragment_decoded(&uri).as_deref(), Some("/$defs/S"));
    }
}
