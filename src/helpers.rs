//! JSON value comparison and shared validator plumbing.

use std::{
    hash::{Hash, Hasher},
    sync::{Arc, Mutex},
};

use ahash::{AHashMap, AHashSet, AHasher};
use fancy_regex::Regex;
use num_cmp::NumCmp;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::error::SchemaError;

macro_rules! num_eq {
    ($left:expr, $right:expr) => {
        if let Some(b) = $right.as_u64() {
            NumCmp::num_eq($left, b)
        } else if let Some(b) = $right.as_i64() {
            NumCmp::num_eq($left, b)
        } else if let Some(b) = $right.as_f64() {
            NumCmp::num_eq($left, b)
        } else {
            false
        }
    };
}

/// Deep JSON value equality. Numbers compare by value, so `1`, `1.0` and
/// the same value stored as `u64` vs `i64` are all equal.
pub(crate) fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => {
            if let Some(x) = a.as_u64() {
                num_eq!(x, b)
            } else if let Some(x) = a.as_i64() {
                num_eq!(x, b)
            } else if let Some(x) = a.as_f64() {
                num_eq!(x, b)
            } else {
                false
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => equal_objects(a, b),
        _ => false,
    }
}

pub(crate) fn equal_objects(left: &Map<String, Value>, right: &Map<String, Value>) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(k, v)| right.get(k).is_some_and(|w| equal(v, w)))
}

/// The instance as a number, when it is one.
pub(crate) fn instance_float(instance: &Value) -> Option<f64> {
    instance.as_f64()
}

/// Wrapper giving JSON values a hash consistent with [`equal`]:
/// integer-valued numbers hash identically however they are stored.
struct HashedValue<'a>(&'a Value);

impl PartialEq for HashedValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        equal(self.0, other.0)
    }
}

impl Eq for HashedValue<'_> {}

impl Hash for HashedValue<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.0 {
            Value::Null => state.write_u32(3_221_225_473),
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i128::from(i).hash(state);
                } else if let Some(u) = n.as_u64() {
                    i128::from(u).hash(state);
                } else if let Some(f) = n.as_f64() {
                    if f.trunc() == f && f >= -9.007_199_254_740_992e15 && f <= 9.007_199_254_740_992e15
                    {
                        i128::from(f as i64).hash(state);
                    } else {
                        f.to_bits().hash(state);
                    }
                }
            }
            Value::String(s) => s.hash(state),
            Value::Array(items) => {
                for item in items {
                    HashedValue(item).hash(state);
                }
            }
            Value::Object(items) => {
                // Field order must not matter; combine per-entry hashes
                // with XOR.
                let mut hash = 0;
                for (key, value) in items {
                    let mut item_hasher = AHasher::default();
                    key.hash(&mut item_hasher);
                    HashedValue(value).hash(&mut item_hasher);
                    hash ^= item_hasher.finish();
                }
                state.write_u64(hash);
            }
        }
    }
}

// Below this size pairwise comparison beats hashing every element.
const ITEMS_SIZE_THRESHOLD: usize = 15;

/// Reports whether all elements are distinct under JSON value equality.
pub(crate) fn is_unique(items: &[Value]) -> bool {
    if items.len() <= 1 {
        return true;
    }
    if items.len() <= ITEMS_SIZE_THRESHOLD {
        for (i, left) in items.iter().enumerate() {
            for right in &items[i + 1..] {
                if equal(left, right) {
                    return false;
                }
            }
        }
        true
    } else {
        let mut seen = AHashSet::with_capacity(items.len());
        items.iter().all(|item| seen.insert(HashedValue(item)))
    }
}

static REGEX_CACHE: Lazy<Mutex<AHashMap<String, Arc<Regex>>>> =
    Lazy::new(|| Mutex::new(AHashMap::new()));

/// Compiles a pattern, reusing previously compiled ones. A pattern that
/// does not compile is a schema error, not a validation failure.
pub(crate) fn compiled_regex(pattern: &str) -> Result<Arc<Regex>, SchemaError> {
    let mut cache = REGEX_CACHE.lock().expect("regex cache poisoned");
    if let Some(re) = cache.get(pattern) {
        return Ok(Arc::clone(re));
    }
    let re = Regex::new(pattern).map_err(|e| SchemaError::Malformed {
        reason: format!("regexp {pattern:?} failed to compile: {e}"),
    })?;
    let re = Arc::new(re);
    cache.insert(pattern.to_string(), Arc::clone(&re));
    Ok(re)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(&json!(1), &json!(1.0))]
    #[test_case(&json!([2]), &json!([2.0]))]
    #[test_case(&json!({"a": 1}), &json!({"a": 1.0}))]
    #[test_case(&json!("x"), &json!("x"))]
    fn equal_values(left: &Value, right: &Value) {
        assert!(equal(left, right));
    }

    #[test_case(&json!(1), &json!(2.0))]
    #[test_case(&json!([]), &json!(["foo"]))]
    #[test_case(&json!(1), &json!("1"))]
    fn unequal_values(left: &Value, right: &Value) {
        assert!(!equal(left, right));
    }

    #[test]
    fn uniqueness_spans_number_representations() {
        let Value::Array(small) = json!([1, 1.0]) else {
            unreachable!()
        };
        assert!(!is_unique(&small));

        // Force the hashing path.
        let mut many: Vec<Value> = (0..20).map(|i| json!(i)).collect();
        assert!(is_unique(&many));
        many.push(json!(7.0));
        assert!(!is_unique(&many));
    }

    #[test]
    fn bad_patterns_are_schema_errors() {
        assert!(compiled_regex("(").is_err());
        assert!(compiled_regex("^a+$").is_ok());
    }
}
