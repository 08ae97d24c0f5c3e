//! # Sort Serialization
//!
//! Converts sort keys into the textual `ORDER BY` clause the server expects,
//! e.g. `name ASC, id DESC`.

use odoorpc_types::OrderSpec;
use serde_json::Value;

/// Join sort keys as `"<name> <ASC|DESC>"` separated by `", "`.
///
/// A key sorts ascending unless `asc` is explicitly `false`. An empty slice
/// produces an empty string.
pub fn serialize_sort(order_by: &[OrderSpec]) -> String {
    order_by
        .iter()
        .map(|order| format!("{} {}", order.name, if order.is_ascending() { "ASC" } else { "DESC" }))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serialize a sort value found in seed params.
///
/// Arrays are read as `{name, asc}` records; entries that are bare strings are
/// taken as ascending field names and entries without a string `name` are
/// skipped. A string is an already-serialized clause and is returned as is,
/// as is any other value.
pub fn serialize_sort_value(value: &Value) -> Value {
    match value {
        Value::Array(entries) => {
            let order_by = entries.iter().filter_map(order_spec_from_value).collect::<Vec<_>>();
            Value::String(serialize_sort(&order_by))
        }
        other => other.clone(),
    }
}

fn order_spec_from_value(value: &Value) -> Option<OrderSpec> {
    match value {
        Value::String(name) => Some(OrderSpec::from(name.as_str())),
        Value::Object(record) => {
            let name = record.get("name")?.as_str()?;
            Some(OrderSpec {
                name: name.to_string(),
                asc: record.get("asc").and_then(Value::as_bool),
            })
        }
        _ => None,
    }
}
