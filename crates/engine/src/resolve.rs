//! # Fallback Resolution
//!
//! Each normalized field is resolved from an ordered chain of candidates: the
//! caller's option, then the seed params, then whatever the seed already put
//! under `kwargs`. The first candidate that is present wins.
//!
//! "Present" means the option was set or the key exists. An explicit `0`,
//! `false` or `null` is a value, not a gap in the chain.

use serde_json::{Map, Value};

/// Return the first present candidate, copied out of the chain.
pub fn first_defined<'a, I>(candidates: I) -> Option<Value>
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    candidates.into_iter().flatten().next().cloned()
}

/// Like [`first_defined`], falling back to `default` when every candidate is absent.
pub fn first_defined_or<'a, I>(candidates: I, default: Value) -> Value
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    first_defined(candidates).unwrap_or(default)
}

/// Write `value` under `key`, or drop the key when there is nothing to write.
///
/// Dropping keeps the position of the remaining keys.
pub fn set_or_remove(target: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    match value {
        Some(value) => {
            target.insert(key.to_string(), value);
        }
        None => target.retain(|existing, _| existing != key),
    }
}

/// Whether the positional argument at `index` has been supplied.
///
/// A JSON `null` in that slot still counts as supplied.
pub fn has_positional(params: &Map<String, Value>, index: usize) -> bool {
    params
        .get("args")
        .and_then(Value::as_array)
        .is_some_and(|args| args.get(index).is_some())
}
