//! Structural copies of params objects.
//!
//! Normalized params are sent verbatim, so they are rebuilt value by value
//! rather than shared with anything the caller still holds. Key order is kept.

use serde_json::{Map, Value};

/// Copy a params object, recursing into nested arrays and objects.
pub fn snapshot_params(params: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), snapshot_value(value)))
        .collect()
}

/// Copy a single JSON value.
pub fn snapshot_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(snapshot_value).collect()),
        Value::Object(map) => Value::Object(snapshot_params(map)),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_keeps_key_order_and_explicit_nulls() {
        let source = json!({"z": null, "a": false, "m": {"y": [1, {"b": null}], "x": 0}});
        let copy = snapshot_value(&source);

        assert_eq!(copy, source);
        assert_eq!(serde_json::to_string(&copy).expect("serialize"), serde_json::to_string(&source).expect("serialize"));
    }

    #[test]
    fn snapshot_is_independent_of_the_source() {
        let mut source = json!({"kwargs": {"context": {"lang": "en_US"}}}).as_object().cloned().expect("object");
        let copy = snapshot_params(&source);

        source["kwargs"]["context"]["lang"] = json!("fr_FR");

        assert_eq!(copy["kwargs"]["context"]["lang"], json!("en_US"));
    }
}
