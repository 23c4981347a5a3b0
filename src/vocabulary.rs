//! Keyword descriptors, vocabularies, and the process-wide registry.
//!
//! A vocabulary is a plain record: the keywords of one JSON Schema draft,
//! a total comparator over keyword names that encodes every inter-keyword
//! ordering dependency, and the draft's reference resolver. There is no
//! inheritance between drafts; each one assembles its own keyword table,
//! reusing validator functions where behaviour is shared.

use std::{cmp::Ordering, fmt, sync::Arc, sync::RwLock};

use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::{
    arg::{Arg, ArgType},
    error::{EvalError, SchemaError},
    resolver::ResolveOpts,
    schema::Schema,
    state::ValidationState,
};

/// The signature of a keyword validator.
///
/// `arg` is the keyword's value in the schema, `instance` the value under
/// validation. An `Err` is either accumulated instance failures or a
/// fatal schema problem; see [`EvalError`].
pub type ValidateFn =
    fn(arg: &Arg, instance: &Value, state: &mut ValidationState<'_>) -> Result<(), EvalError>;

/// The signature of a draft's reference resolver.
pub type ResolveFn = fn(schema: &mut Schema, opts: &ResolveOpts) -> Result<(), SchemaError>;

/// A schema keyword descriptor.
pub struct Keyword {
    /// The keyword, such as `allOf` or `properties`.
    pub name: String,
    /// The expected argument shape.
    pub arg_type: ArgType,
    /// Checks an instance against the keyword. `None` for keywords that
    /// never affect the validation outcome.
    pub validate: Option<ValidateFn>,
    /// True for internal book-keeping keywords inserted by the resolver.
    /// Generated keywords never appear in JSON, in [`children`]
    /// (crate::Schema::children), or in pointer navigation.
    pub generated: bool,
}

impl Keyword {
    /// A validating keyword.
    pub fn new(name: &str, arg_type: ArgType, validate: ValidateFn) -> Arc<Keyword> {
        Arc::new(Keyword {
            name: name.to_string(),
            arg_type,
            validate: Some(validate),
            generated: false,
        })
    }

    /// A keyword that carries information but always matches.
    pub fn annotation(name: &str, arg_type: ArgType) -> Arc<Keyword> {
        Arc::new(Keyword {
            name: name.to_string(),
            arg_type,
            validate: None,
            generated: false,
        })
    }

    /// A generated book-keeping keyword.
    pub(crate) fn generated(
        name: &str,
        arg_type: ArgType,
        validate: Option<ValidateFn>,
    ) -> Arc<Keyword> {
        Arc::new(Keyword {
            name: name.to_string(),
            arg_type,
            validate,
            generated: true,
        })
    }

    /// An unrecognized keyword: kept for serialization and pointer
    /// navigation, inert for validation.
    pub(crate) fn unknown(name: &str) -> Arc<Keyword> {
        Arc::new(Keyword {
            name: name.to_string(),
            arg_type: ArgType::Any,
            validate: None,
            generated: false,
        })
    }
}

// Validator functions are not comparable; two descriptors are equal when
// everything else agrees.
impl PartialEq for Keyword {
    fn eq(&self, other: &Keyword) -> bool {
        self.name == other.name
            && self.arg_type == other.arg_type
            && self.generated == other.generated
    }
}

impl Eq for Keyword {}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyword")
            .field("name", &self.name)
            .field("arg_type", &self.arg_type)
            .field("generated", &self.generated)
            .finish_non_exhaustive()
    }
}

/// One keyword of a vocabulary under construction, with the names of the
/// keywords that must sort before it.
pub struct KeywordSpec {
    pub keyword: Arc<Keyword>,
    pub after: &'static [&'static str],
}

impl KeywordSpec {
    pub fn new(keyword: Arc<Keyword>) -> KeywordSpec {
        KeywordSpec {
            keyword,
            after: &[],
        }
    }

    pub fn after(keyword: Arc<Keyword>, after: &'static [&'static str]) -> KeywordSpec {
        KeywordSpec { keyword, after }
    }
}

/// A JSON Schema draft: its keywords, ordering, and resolver.
pub struct Vocabulary {
    /// Short name, such as `draft2020-12`. Used in messages and by
    /// [`set_default_schema`].
    pub name: String,
    /// The URI identifying the draft, the value of `$schema`.
    pub schema_id: String,
    keywords: AHashMap<String, Arc<Keyword>>,
    rank: AHashMap<String, usize>,
    resolve: ResolveFn,
}

impl Vocabulary {
    /// Builds a vocabulary, computing the comparator ranking from the
    /// per-keyword `after` constraints.
    pub fn new(
        name: &str,
        schema_id: &str,
        specs: Vec<KeywordSpec>,
        resolve: ResolveFn,
    ) -> Arc<Vocabulary> {
        let rank = compute_rank(&specs);
        let keywords = specs
            .into_iter()
            .map(|s| (s.keyword.name.clone(), s.keyword))
            .collect();
        Arc::new(Vocabulary {
            name: name.to_string(),
            schema_id: schema_id.to_string(),
            keywords,
            rank,
            resolve,
        })
    }

    /// Looks up a keyword descriptor by name.
    pub fn keyword(&self, name: &str) -> Option<&Arc<Keyword>> {
        self.keywords.get(name)
    }

    /// Iterates over all keyword descriptors.
    pub fn keywords(&self) -> impl Iterator<Item = &Arc<Keyword>> {
        self.keywords.values()
    }

    /// The total keyword ordering used by
    /// [`finalize`](crate::Schema::finalize). Names missing from the
    /// ranking (unknown or generated keywords) sort first.
    pub fn cmp(&self, a: &str, b: &str) -> Ordering {
        let ra = self.rank.get(a).copied().unwrap_or(0);
        let rb = self.rank.get(b).copied().unwrap_or(0);
        ra.cmp(&rb)
    }

    pub(crate) fn run_resolve(
        &self,
        schema: &mut Schema,
        opts: &ResolveOpts,
    ) -> Result<(), SchemaError> {
        (self.resolve)(schema, opts)
    }
}

impl fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vocabulary")
            .field("name", &self.name)
            .field("schema_id", &self.schema_id)
            .field("keywords", &self.keywords.len())
            .finish_non_exhaustive()
    }
}

/// Ranks keywords so that every `after` target sorts before its keyword,
/// and unconstrained keywords stay in lexicographic order.
///
/// Keywords are taken in descending name order and inserted into a
/// reversed ranking: each keyword lands at the end unless one of its
/// `after` targets is already placed, in which case it lands in front of
/// the earliest such target. Reversing the list yields the final ranks.
fn compute_rank(specs: &[KeywordSpec]) -> AHashMap<String, usize> {
    let mut sorted: Vec<&KeywordSpec> = specs.iter().collect();
    sorted.sort_by(|a, b| b.keyword.name.cmp(&a.keyword.name));

    let mut ranked: Vec<&str> = Vec::with_capacity(sorted.len());
    for spec in sorted {
        let mut ins = ranked.len();
        for target in spec.after {
            if let Some(i) = ranked.iter().position(|r| r == target) {
                ins = ins.min(i);
            }
        }
        ranked.insert(ins, spec.keyword.name.as_str());
    }
    ranked.reverse();

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect()
}

#[derive(Default)]
struct Registry {
    mapping: AHashMap<String, Arc<Vocabulary>>,
    default: Option<Arc<Vocabulary>>,
}

impl Registry {
    fn add(&mut self, vocabulary: Arc<Vocabulary>, default: bool) {
        let key = vocabulary.schema_id.clone();
        if self.mapping.contains_key(&key) {
            panic!("multiple attempts to register vocabulary {key:?}");
        }
        self.mapping.insert(key, Arc::clone(&vocabulary));
        if default {
            if self.default.is_some() {
                panic!("multiple default vocabularies");
            }
            self.default = Some(vocabulary);
        }
    }
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| {
    let mut registry = Registry::default();
    registry.add(crate::draft202012::vocabulary(), true);
    registry.add(crate::draft7::vocabulary(), false);
    RwLock::new(registry)
});

/// Registers a vocabulary. The built-in drafts are registered up front;
/// this is for additional drafts or custom keyword sets.
///
/// # Panics
///
/// Panics if the schema URI is already registered, or if `default` is set
/// while a default vocabulary already exists.
pub fn register_vocabulary(vocabulary: Arc<Vocabulary>, default: bool) {
    REGISTRY
        .write()
        .expect("vocabulary registry poisoned")
        .add(vocabulary, default);
}

/// Returns the vocabulary registered for a `$schema` URI, tolerating the
/// trailing `#` older drafts carry (`http://json-schema.org/draft-07/schema#`).
pub fn lookup_vocabulary(schema_id: &str) -> Option<Arc<Vocabulary>> {
    let key = schema_id.trim_end_matches('#');
    REGISTRY
        .read()
        .expect("vocabulary registry poisoned")
        .mapping
        .get(key)
        .cloned()
}

/// Returns the default vocabulary, used when a schema has no `$schema`.
pub fn default_vocabulary() -> Option<Arc<Vocabulary>> {
    let registry = REGISTRY.read().expect("vocabulary registry poisoned");
    if let Some(d) = &registry.default {
        return Some(Arc::clone(d));
    }
    if registry.mapping.len() == 1 {
        return registry.mapping.values().next().cloned();
    }
    None
}

/// Sets the default vocabulary by draft name, e.g. `draft7` or
/// `draft2020-12`. Mainly for tests.
pub fn set_default_schema(name: &str) -> Result<(), SchemaError> {
    let mut registry = REGISTRY.write().expect("vocabulary registry poisoned");
    let found = registry
        .mapping
        .values()
        .find(|v| v.name == name)
        .cloned();
    match found {
        Some(v) => {
            registry.default = Some(v);
            Ok(())
        }
        None => Err(SchemaError::UnknownVocabulary {
            schema: name.to_string(),
        }),
    }
}
