//! Query descriptions accepted by the normalizer and the canonical output it emits.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Route of the `search_read` web controller, which takes its arguments at the
/// top level of `params` instead of nested under `kwargs`.
pub const SEARCH_READ_ROUTE: &str = "/web/dataset/search_read";

/// Route prefix used when a call is addressed by model and method.
pub const CALL_KW_ROUTE_PREFIX: &str = "/web/dataset/call_kw";

/// Long-polling bus endpoint.
pub const LONGPOLLING_ROUTE: &str = "/longpolling/poll";

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field name to sort on.
    pub name: String,
    /// Sort direction. Anything other than an explicit `false` sorts ascending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asc: Option<bool>,
}

impl OrderSpec {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asc: Some(true),
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asc: Some(false),
        }
    }

    /// Returns `true` unless the direction was explicitly set to descending.
    pub fn is_ascending(&self) -> bool {
        self.asc != Some(false)
    }
}

impl From<&str> for OrderSpec {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
            asc: None,
        }
    }
}

/// Row limit for a search call.
///
/// The server treats a literal `false` as "no limit", so [`Limit::Unbounded`]
/// serializes to `false` rather than being omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Unbounded,
}

impl Limit {
    /// Wire representation of the limit.
    pub fn to_value(self) -> Value {
        match self {
            Self::Count(count) => Value::from(count),
            Self::Unbounded => Value::Bool(false),
        }
    }
}

impl From<u64> for Limit {
    fn from(count: u64) -> Self {
        Self::Count(count)
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(count) => serializer.serialize_u64(*count),
            Self::Unbounded => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(number) => number
                .as_u64()
                .map(Self::Count)
                .ok_or_else(|| D::Error::custom(format!("limit must be a non-negative integer, got {number}"))),
            Value::Bool(false) => Ok(Self::Unbounded),
            other => Err(D::Error::custom(format!("limit must be an integer or false, got {other}"))),
        }
    }
}

/// Caller-supplied description of a remote call.
///
/// Every field is optional; the normalizer decides which of them apply based on
/// `route` and `method`. `params` seeds the output with a previously built (or
/// partially built) params object so calls can be composed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Explicit server path. Takes precedence over the synthesized `call_kw` route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Technical model name, e.g. `res.partner`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Model method to invoke, e.g. `search_read`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Positional arguments forwarded to the method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
    /// Keyword arguments forwarded to the method.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub kwargs: Map<String, Value>,
    /// Search domain. Passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Grouping fields; only meaningful for `read_group`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Limit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<OrderSpec>>,
    /// Request context, merged into `kwargs.context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    /// `read_group` laziness flag. `Some(Value::Null)` means the caller explicitly
    /// cleared it, which is distinct from not mentioning it at all.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub lazy: Option<Value>,
    /// Seed params to merge into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

/// Maps a present key to `Some`, including an explicit `null`.
fn deserialize_present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl QueryOptions {
    /// Describe a `call_kw` invocation of `method` on `model`.
    pub fn call(model: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            method: Some(method.into()),
            ..Self::default()
        }
    }

    /// Describe a call to an explicit controller route.
    pub fn route(route: impl Into<String>) -> Self {
        Self {
            route: Some(route.into()),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    pub fn with_domain(mut self, domain: Value) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_group_by<I, S>(mut self, group_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = Some(group_by.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(Limit::Count(limit));
        self
    }

    /// Ask for every matching record.
    pub fn with_unbounded_limit(mut self) -> Self {
        self.limit = Some(Limit::Unbounded);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderSpec>) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_lazy(mut self, lazy: Value) -> Self {
        self.lazy = Some(lazy);
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }
}

/// Normalized call ready to be wrapped in a JSON-RPC envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalQuery {
    /// Server path; empty when neither a route nor model+method was supplied.
    pub route: String,
    pub params: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_options_deserialize_camel_case_keys() {
        let options: QueryOptions = serde_json::from_value(json!({
            "model": "res.partner",
            "method": "read_group",
            "groupBy": ["country_id"],
            "orderBy": [{"name": "name"}, {"name": "id", "asc": false}],
            "limit": false
        }))
        .expect("options deserialize");

        assert_eq!(options.group_by, Some(vec!["country_id".to_string()]));
        assert_eq!(options.order_by, Some(vec![OrderSpec::from("name"), OrderSpec::desc("id")]));
        assert_eq!(options.limit, Some(Limit::Unbounded));
        assert!(options.kwargs.is_empty());
    }

    #[test]
    fn explicit_null_lazy_is_distinct_from_missing() {
        let explicit: QueryOptions = serde_json::from_value(json!({ "lazy": null })).expect("explicit null");
        let missing: QueryOptions = serde_json::from_value(json!({})).expect("missing");

        assert_eq!(explicit.lazy, Some(Value::Null));
        assert_eq!(missing.lazy, None);
    }

    #[test]
    fn limit_rejects_true_and_negative_values() {
        assert!(serde_json::from_value::<Limit>(json!(true)).is_err());
        assert!(serde_json::from_value::<Limit>(json!(-1)).is_err());
        assert_eq!(serde_json::to_value(Limit::Unbounded).expect("serialize"), json!(false));
        assert_eq!(Limit::Count(80).to_value(), json!(80));
    }

    #[test]
    fn order_spec_defaults_to_ascending() {
        assert!(OrderSpec::from("name").is_ascending());
        assert!(OrderSpec::asc("name").is_ascending());
        assert!(!OrderSpec::desc("name").is_ascending());
    }
}
