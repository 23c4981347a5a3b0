//! Reference resolution.
//!
//! Resolution runs two passes over a schema tree and rewrites the arena
//! in place, so that validation never has to chase URIs:
//!
//! 1. **Discover** walks top-down with the inherited base URI, recording
//!    every `$id` in an ID table, every `$anchor`/`$dynamicAnchor` in an
//!    anchor table, and the base URI in force at every node that carries
//!    a reference. A node owning a dynamic anchor gets a pair of
//!    generated parts (`$$recordDynamicAnchor` first,
//!    `$$clearDynamicAnchor` last) spliced into its base-owning node,
//!    which establishes the anchor's dynamic scope at evaluation time.
//! 2. **Resolve** turns every `$ref`/`$dynamicRef` into a generated part
//!    pointing straight at the target node: `$$resolvedRef`,
//!    `$$resolvedDynamicRef` for statically-resolved dynamic refs, or
//!    `$$detachedDynamicRef` as the fallback target of a genuinely
//!    dynamic ref. Remote documents are fetched through the [`Loader`],
//!    absorbed into the same arena, cached by their fragmentless URI,
//!    and resolved within the same resolver state so their IDs and
//!    anchors become visible.
//!
//! The ref graph may be cyclic; the resolver only records edges, and the
//! evaluator's depth cap breaks cycles.

use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use fluent_uri::UriRef;
use once_cell::sync::Lazy;

use crate::{
    arg::{AnchorArg, Arg, ArgType},
    error::SchemaError,
    keywords::references,
    metaschema, pointer,
    schema::{NodeId, Schema},
    uri,
    vocabulary::{Keyword, Vocabulary},
};

/// Loads remote schemas for the resolver.
///
/// `schema_id` is the draft of the referring schema, e.g.
/// [`crate::draft202012::SCHEMA_ID`]; `uri` never carries a fragment. The
/// loader returns a parsed but unresolved schema (see
/// [`Schema::parse_unresolved`]); the resolver resolves it within the
/// current resolution state, so loaders must not resolve themselves.
///
/// When unmarshalling user-written schemas the loader can be called with
/// arbitrary URIs; fetching them blindly over the network is unwise.
pub trait Loader: Send + Sync {
    fn load(
        &self,
        schema_id: &str,
        uri: &UriRef<String>,
    ) -> Result<Schema, Box<dyn std::error::Error + Send + Sync>>;
}

static LOADER: Lazy<RwLock<Option<Arc<dyn Loader>>>> = Lazy::new(|| RwLock::new(None));

/// Sets the process-wide loader used when [`ResolveOpts`] does not carry
/// one, returning the previous loader. The default is none, which makes
/// external references fail.
pub fn set_loader(loader: Option<Arc<dyn Loader>>) -> Option<Arc<dyn Loader>> {
    let mut slot = LOADER.write().expect("loader registry poisoned");
    std::mem::replace(&mut *slot, loader)
}

fn global_loader() -> Option<Arc<dyn Loader>> {
    LOADER.read().expect("loader registry poisoned").clone()
}

/// Options for [`Schema::resolve`]. All fields are optional.
#[derive(Clone, Default)]
pub struct ResolveOpts {
    /// Overrides the vocabulary recorded with the schema.
    pub vocabulary: Option<Arc<Vocabulary>>,
    /// URI of the schema root; overridden by a root `$id`.
    pub uri: Option<UriRef<String>>,
    /// Loads remote references. Falls back to the global loader.
    pub loader: Option<Arc<dyn Loader>>,
}

// Generated keywords inserted by the resolver. Identity (Arc pointer)
// distinguishes them from anything a user could write.

/// Records what a `$ref` resolved to.
pub(crate) static RESOLVED_REF: Lazy<Arc<Keyword>> =
    Lazy::new(|| Keyword::generated("$$resolvedRef", ArgType::Schema, None));

/// Records what a `$dynamicRef` resolved to when the target anchor is not
/// actually dynamic, making the reference static.
pub(crate) static RESOLVED_DYNAMIC_REF: Lazy<Arc<Keyword>> =
    Lazy::new(|| Keyword::generated("$$resolvedDynamicRef", ArgType::Schema, None));

/// The lexical target of a genuinely dynamic `$dynamicRef`: consulted
/// only when the evaluation-time scope does not contain the anchor,
/// which happens when evaluation entered below the recording base.
pub(crate) static DETACHED_DYNAMIC_REF: Lazy<Arc<Keyword>> =
    Lazy::new(|| Keyword::generated("$$detachedDynamicRef", ArgType::Schema, None));

/// Adds a dynamic anchor to the evaluation scope; placed first in the
/// base-owning node.
pub(crate) static RECORD_DYNAMIC_ANCHOR: Lazy<Arc<Keyword>> = Lazy::new(|| {
    Keyword::generated(
        "$$recordDynamicAnchor",
        ArgType::Any,
        Some(references::validate_record_dynamic_anchor),
    )
});

/// Removes a dynamic anchor from the evaluation scope; placed last in
/// the base-owning node.
pub(crate) static CLEAR_DYNAMIC_ANCHOR: Lazy<Arc<Keyword>> = Lazy::new(|| {
    Keyword::generated(
        "$$clearDynamicAnchor",
        ArgType::Any,
        Some(references::validate_clear_dynamic_anchor),
    )
});

/// The per-draft knobs of the shared resolver.
pub(crate) struct RefRules {
    /// The draft URI, passed to loaders and nested parses.
    pub schema_id: &'static str,
    /// Whether `$anchor`/`$dynamicAnchor`/`$dynamicRef` exist.
    pub dynamic: bool,
    /// Whether a plain-name `$id` fragment declares an anchor (draft 7).
    pub id_fragment_anchors: bool,
    /// Path prefix of this draft's meta-schemas on `json-schema.org`.
    pub metaschema_prefix: &'static str,
    /// Embedded meta-schema documents, keyed by the path remainder.
    pub metaschemas: &'static [(&'static str, &'static str)],
}

struct AnchorEntry {
    node: NodeId,
    dynamic: bool,
}

struct ResolverState<'a> {
    rules: &'a RefRules,
    loader: Option<Arc<dyn Loader>>,
    /// `$id` base URI → node.
    ids: AHashMap<String, NodeId>,
    /// Full anchor URI (`base#name`) → anchor.
    anchors: AHashMap<String, AnchorEntry>,
    /// Base URI in force at every node carrying a reference.
    ref_bases: AHashMap<NodeId, Option<UriRef<String>>>,
    /// Fragmentless URI → root of the document absorbed for it.
    cache: AHashMap<String, NodeId>,
}

/// Entry point used by the draft vocabularies.
pub(crate) fn resolve_schema(
    schema: &mut Schema,
    opts: &ResolveOpts,
    rules: &RefRules,
) -> Result<(), SchemaError> {
    let mut state = ResolverState {
        rules,
        loader: opts.loader.clone().or_else(global_loader),
        ids: AHashMap::new(),
        anchors: AHashMap::new(),
        ref_bases: AHashMap::new(),
        cache: AHashMap::new(),
    };
    let root = schema.root();
    resolve_ref_schema(schema, opts.uri.clone(), root, &mut state)
}

/// Resolves one document (the root or a loaded one) that may have a
/// known URI.
fn resolve_ref_schema(
    schema: &mut Schema,
    uri: Option<UriRef<String>>,
    node: NodeId,
    state: &mut ResolverState<'_>,
) -> Result<(), SchemaError> {
    let mut path = Vec::new();
    discover(schema, node, node, uri, &mut path, state)?;
    path.clear();
    resolve_refs(schema, node, &mut path, state)
}

fn location(path: &[String]) -> String {
    format!("/{}", path.join("/"))
}

/// Pass 1: find IDs and anchors, and splice in dynamic-anchor scope
/// management.
fn discover(
    schema: &mut Schema,
    node: NodeId,
    base: NodeId,
    uri: Option<UriRef<String>>,
    path: &mut Vec<String>,
    state: &mut ResolverState<'_>,
) -> Result<(), SchemaError> {
    let mut id_value = None;
    let mut anchors = Vec::new();
    let mut dynamic_anchor: Option<String> = None;
    let mut has_ref = false;
    for part in schema.parts(node) {
        if part.keyword.generated {
            continue;
        }
        match (part.keyword.name.as_str(), &part.value) {
            ("$id", Arg::String(s)) => id_value = Some(s.clone()),
            ("$anchor", Arg::String(s)) if state.rules.dynamic => {
                anchors.push((s.clone(), false));
            }
            ("$dynamicAnchor", Arg::String(s)) if state.rules.dynamic => {
                if dynamic_anchor.is_some() {
                    return Err(SchemaError::DuplicateKeyword {
                        keyword: "$dynamicAnchor".to_string(),
                        location: location(path),
                    });
                }
                dynamic_anchor = Some(s.clone());
                anchors.push((s.clone(), true));
            }
            ("$ref" | "$dynamicRef", Arg::String(_)) => has_ref = true,
            _ => {}
        }
    }

    // The node's own $id establishes the base for its sibling anchors
    // and for everything below it.
    let mut uri = uri;
    let mut base = base;
    if let Some(id) = id_value {
        let (new_uri, anchor_from_id) = register_id(node, &id, &uri, path, state)?;
        if let Some(new_uri) = new_uri {
            uri = Some(new_uri);
            base = node;
        }
        if let Some(anchor) = anchor_from_id {
            register_anchor(node, false, &anchor, &uri, path, state)?;
        }
    }

    for (name, dynamic) in anchors {
        register_anchor(node, dynamic, &name, &uri, path, state)?;
    }

    if has_ref {
        state.ref_bases.insert(node, uri.clone());
    }

    if let Some(name) = dynamic_anchor {
        // Splice scope management into the base-owning node, unless the
        // base already records a dynamic anchor; the outermost one wins.
        let already = schema
            .parts(base)
            .iter()
            .any(|p| Arc::ptr_eq(&p.keyword, &RECORD_DYNAMIC_ANCHOR));
        if !already {
            let anchor = AnchorArg { name, node };
            let parts = &mut schema.node_mut(base).parts;
            parts.insert(
                0,
                crate::Part::new(
                    Arc::clone(&RECORD_DYNAMIC_ANCHOR),
                    Arg::Anchor(anchor.clone()),
                ),
            );
            parts.push(crate::Part::new(
                Arc::clone(&CLEAR_DYNAMIC_ANCHOR),
                Arg::Anchor(anchor),
            ));
        }
    }

    for (name, child) in schema.children(node) {
        path.push(name);
        discover(schema, child, base, uri.clone(), path, state)?;
        path.pop();
    }

    Ok(())
}

/// Handles `$id`. Returns the new base URI, if the ID establishes one,
/// and the anchor name, if a draft-7-style fragment declares one.
fn register_id(
    node: NodeId,
    id: &str,
    base: &Option<UriRef<String>>,
    path: &mut Vec<String>,
    state: &mut ResolverState<'_>,
) -> Result<(Option<UriRef<String>>, Option<String>), SchemaError> {
    let parsed = uri::from_str(id)?;
    let resolved = match base {
        Some(base) if !uri::is_absolute(&parsed) => uri::resolve_against(base, id)?,
        _ => parsed,
    };

    let fragment = uri::fragment_decoded(&resolved).filter(|f| !f.is_empty());
    if let Some(frag) = fragment {
        if state.rules.id_fragment_anchors && !frag.starts_with('/') {
            // Draft 7 spells anchors as "$id": "#name".
            return Ok((None, Some(frag)));
        }
        return Err(SchemaError::IdWithFragment {
            id: id.to_string(),
            location: location(path),
        });
    }

    let key = uri::without_fragment(&resolved).to_string();
    state.ids.insert(key.clone(), node);
    Ok((Some(uri::from_str(&key)?), None))
}

/// Registers an `$anchor` or `$dynamicAnchor` under the base in force.
fn register_anchor(
    node: NodeId,
    dynamic: bool,
    name: &str,
    base: &Option<UriRef<String>>,
    path: &mut Vec<String>,
    state: &mut ResolverState<'_>,
) -> Result<(), SchemaError> {
    let base_str = base.as_ref().map(|u| u.as_str()).unwrap_or("");
    let key = format!("{base_str}#{name}");
    if state.anchors.contains_key(&key) {
        return Err(SchemaError::DuplicateAnchor {
            anchor: key,
            location: location(path),
        });
    }
    state.anchors.insert(key, AnchorEntry { node, dynamic });
    Ok(())
}

/// Pass 2: rewrite every reference into a generated part.
fn resolve_refs(
    schema: &mut Schema,
    node: NodeId,
    path: &mut Vec<String>,
    state: &mut ResolverState<'_>,
) -> Result<(), SchemaError> {
    let mut refs = Vec::new();
    let (mut saw_ref, mut saw_dynamic) = (false, false);
    for part in schema.parts(node) {
        if part.keyword.generated {
            continue;
        }
        match (part.keyword.name.as_str(), &part.value) {
            ("$ref", Arg::String(s)) => {
                if saw_ref {
                    return Err(SchemaError::DuplicateKeyword {
                        keyword: "$ref".to_string(),
                        location: location(path),
                    });
                }
                saw_ref = true;
                refs.push((false, s.clone()));
            }
            ("$dynamicRef", Arg::String(s)) => {
                if saw_dynamic {
                    return Err(SchemaError::DuplicateKeyword {
                        keyword: "$dynamicRef".to_string(),
                        location: location(path),
                    });
                }
                saw_dynamic = true;
                refs.push((true, s.clone()));
            }
            _ => {}
        }
    }

    for (dynamic, reference) in refs {
        resolve_ref(schema, node, dynamic, &reference, path, state)?;
    }

    for (name, child) in schema.children(node) {
        path.push(name);
        resolve_refs(schema, child, path, state)?;
        path.pop();
    }

    Ok(())
}

fn add_ref(schema: &mut Schema, node: NodeId, target: NodeId, dynamic: bool, detached: bool) {
    let keyword = if detached {
        &DETACHED_DYNAMIC_REF
    } else if dynamic {
        &RESOLVED_DYNAMIC_REF
    } else {
        &RESOLVED_REF
    };
    schema
        .node_mut(node)
        .parts
        .push(crate::Part::new(Arc::clone(keyword), Arg::Schema(target)));
}

fn resolve_ref(
    schema: &mut Schema,
    node: NodeId,
    dynamic: bool,
    reference: &str,
    path: &mut Vec<String>,
    state: &mut ResolverState<'_>,
) -> Result<(), SchemaError> {
    let Some(base) = state.ref_bases.get(&node).cloned() else {
        return Err(SchemaError::Malformed {
            reason: format!("discovery did not record a base for reference {reference:?}"),
        });
    };
    let ref_uri = match &base {
        Some(base) => uri::resolve_against(base, reference)?,
        None => uri::from_str(reference)?,
    };

    let fragment = uri::fragment_decoded(&ref_uri).filter(|f| !f.is_empty());
    // A $dynamicRef whose fragment is a JSON pointer is not really
    // dynamic.
    let dynamic_fragment =
        dynamic && fragment.as_deref().is_some_and(|f| !f.starts_with('/'));

    if let Some(entry) = state.anchors.get(ref_uri.as_str()) {
        let detached = dynamic_fragment && entry.dynamic;
        add_ref(schema, node, entry.node, dynamic, detached);
        return Ok(());
    }

    let document = resolve_uri(schema, &ref_uri, path, state)?;

    // Loading and resolving the document may have made the anchor
    // visible.
    if let Some(entry) = state.anchors.get(ref_uri.as_str()) {
        let detached = dynamic_fragment && entry.dynamic;
        add_ref(schema, node, entry.node, dynamic, detached);
        return Ok(());
    }

    let target = match fragment {
        None => document,
        Some(frag) if frag.starts_with('/') => {
            pointer::deref_schema(schema, state.rules.schema_id, document, &frag)?
        }
        Some(_) => {
            return Err(SchemaError::UnresolvedRef {
                reference: ref_uri.as_str().to_string(),
                location: location(path),
            })
        }
    };

    add_ref(schema, node, target, dynamic, false);
    Ok(())
}

/// Finds the document a fragmentless URI refers to: the root, a known
/// `$id`, an embedded meta-schema, or a remote document via the loader.
fn resolve_uri(
    schema: &mut Schema,
    ref_uri: &UriRef<String>,
    path: &mut Vec<String>,
    state: &mut ResolverState<'_>,
) -> Result<NodeId, SchemaError> {
    let no_frag = uri::without_fragment(ref_uri).to_string();

    if no_frag.is_empty() {
        return Ok(schema.root());
    }
    if let Some(&node) = state.ids.get(&no_frag) {
        return Ok(node);
    }
    if let Some(&node) = state.cache.get(&no_frag) {
        return Ok(node);
    }

    let no_frag_uri = uri::from_str(&no_frag)?;
    if !uri::is_absolute(&no_frag_uri) {
        return Err(SchemaError::UnresolvedRef {
            reference: no_frag,
            location: location(path),
        });
    }

    let loaded = match metaschema::lookup(state.rules, &no_frag_uri) {
        Some(text) => {
            let value: serde_json::Value =
                serde_json::from_str(text).map_err(|e| SchemaError::Load {
                    uri: no_frag.clone(),
                    reason: format!("embedded meta-schema is invalid: {e}"),
                })?;
            Schema::parse_unresolved(Some(state.rules.schema_id), &value).map_err(|e| {
                SchemaError::Load {
                    uri: no_frag.clone(),
                    reason: format!("embedded meta-schema did not parse: {e}"),
                }
            })?
        }
        None => {
            let Some(loader) = state.loader.clone() else {
                return Err(SchemaError::LoadNotPermitted {
                    uri: no_frag,
                    location: location(path),
                });
            };
            loader
                .load(state.rules.schema_id, &no_frag_uri)
                .map_err(|e| SchemaError::Load {
                    uri: no_frag.clone(),
                    reason: e.to_string(),
                })?
        }
    };

    let root = schema.absorb(loaded);

    // Cache before resolving: resolving the document may reference it
    // again.
    state.cache.insert(no_frag, root);
    resolve_ref_schema(schema, Some(no_frag_uri), root, state)?;

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts_named<'a>(schema: &'a Schema, node: NodeId, name: &str) -> Vec<&'a crate::Part> {
        schema
            .parts(node)
            .iter()
            .filter(|p| p.keyword.name == name)
            .collect()
    }

    #[test]
    fn every_ref_gains_a_resolved_sibling() {
        let schema = Schema::from_value(&json!({
            "$defs": {"s": {"type": "string"}},
            "$ref": "#/$defs/s"
        }))
        .unwrap();
        let resolved = parts_named(&schema, schema.root(), "$$resolvedRef");
        assert_eq!(resolved.len(), 1);
        let Arg::Schema(target) = &resolved[0].value else {
            panic!("resolved ref must carry a schema");
        };
        assert!(schema.lookup_keyword(*target, "type").is_some());
    }

    #[test]
    fn anchors_resolve_within_their_base() {
        let schema = Schema::from_value(&json!({
            "$id": "https://example.com/root",
            "$defs": {"s": {"$anchor": "leaf", "type": "null"}},
            "$ref": "#leaf"
        }))
        .unwrap();
        assert_eq!(parts_named(&schema, schema.root(), "$$resolvedRef").len(), 1);
        assert!(schema.is_valid(&json!(null)));
        assert!(!schema.is_valid(&json!(1)));
    }

    #[test]
    fn dynamic_anchor_brackets_its_base() {
        let schema = Schema::from_value(&json!({
            "$id": "https://example.com/list",
            "$dynamicAnchor": "T",
            "type": ["array", "integer"]
        }))
        .unwrap();
        let parts = schema.parts(schema.root());
        assert!(Arc::ptr_eq(&parts[0].keyword, &RECORD_DYNAMIC_ANCHOR));
        assert!(Arc::ptr_eq(
            &parts[parts.len() - 1].keyword,
            &CLEAR_DYNAMIC_ANCHOR
        ));
    }

    #[test]
    fn duplicate_anchors_are_rejected() {
        let err = Schema::from_value(&json!({
            "$defs": {
                "a": {"$anchor": "x"},
                "b": {"$anchor": "x"}
            }
        }));
        assert!(matches!(err, Err(SchemaError::DuplicateAnchor { .. })));
    }

    #[test]
    fn id_fragments_are_rejected_in_2020_12() {
        let err = Schema::from_value(&json!({"$id": "https://example.com/x#frag"}));
        assert!(matches!(err, Err(SchemaError::IdWithFragment { .. })));
    }

    #[test]
    fn external_refs_fail_without_a_loader() {
        let err = Schema::from_value(&json!({"$ref": "https://nonexistent.invalid/s"}));
        assert!(matches!(err, Err(SchemaError::LoadNotPermitted { .. })));
    }

    #[test]
    fn metaschema_refs_use_embedded_documents() {
        let schema = Schema::from_value(&json!({
            "$ref": "https://json-schema.org/draft/2020-12/meta/validation#/$defs/nonNegativeInteger"
        }))
        .unwrap();
        assert!(schema.is_valid(&json!(3)));
        assert!(!schema.is_valid(&json!(-1)));
    }
}
