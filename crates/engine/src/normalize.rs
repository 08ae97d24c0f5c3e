//! # Query Normalization
//!
//! Turns a [`QueryOptions`] description into the exact `(route, params)` pair a
//! server expects for one of its calling conventions:
//!
//! - **`call_kw`**: any call with a `method`; arguments go under `args`/`kwargs`.
//! - **`read_group`**: `call_kw` plus domain/fields/groupby defaults that yield to
//!   positional arguments, and a serialized `orderby`.
//! - **`search_read`**: `call_kw` plus domain/fields/paging and a serialized `order`.
//! - **`/web/dataset/search_read`**: the web controller, which reads its arguments
//!   from the top level of `params` and names the sort clause `sort`.
//!
//! Normalization never fails. A description with neither a route nor a
//! model+method pair yields an empty route for the transport to reject.

use odoorpc_types::{CALL_KW_ROUTE_PREFIX, CanonicalQuery, QueryOptions, SEARCH_READ_ROUTE};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::resolve::{first_defined, first_defined_or, has_positional, set_or_remove};
use crate::snapshot::{snapshot_params, snapshot_value};
use crate::sort::{serialize_sort, serialize_sort_value};

const READ_GROUP: &str = "read_group";
const SEARCH_READ: &str = "search_read";

/// Caller options converted to wire values once, so every fallback chain can
/// borrow them alongside the seed params.
#[derive(Debug)]
struct CallerValues {
    model: Option<Value>,
    domain: Option<Value>,
    fields: Option<Value>,
    group_by: Option<Value>,
    limit: Option<Value>,
    offset: Option<Value>,
    order_by: Option<Value>,
    context: Option<Value>,
}

impl CallerValues {
    fn from_options(options: &QueryOptions) -> Self {
        Self {
            model: options.model.clone().map(Value::String),
            domain: options.domain.as_ref().map(snapshot_value),
            fields: options.fields.clone().map(Value::from),
            group_by: options.group_by.clone().map(Value::from),
            limit: options.limit.map(|limit| limit.to_value()),
            offset: options.offset.map(Value::from),
            order_by: options.order_by.as_deref().map(|order_by| Value::String(serialize_sort(order_by))),
            context: options.context.as_ref().map(|context| Value::Object(snapshot_params(context))),
        }
    }
}

/// Resolve the route and build canonical params for `options`.
///
/// The seed `options.params` is copied before anything is merged into it, and
/// every caller value is copied on the way in, so the result shares nothing
/// with `options`.
pub fn normalize(options: &QueryOptions) -> CanonicalQuery {
    let route = resolve_route(options);
    let caller = CallerValues::from_options(options);
    let mut params = options.params.as_ref().map(snapshot_params).unwrap_or_default();

    if let Some(method) = options.method.as_deref() {
        let mut kwargs = take_kwargs(&mut params);
        shape_call(options, method, &caller, &mut params, &mut kwargs);
        match method {
            READ_GROUP => apply_read_group(options, &caller, &params, &mut kwargs),
            SEARCH_READ => apply_search_read(&caller, &params, &mut kwargs),
            _ => {}
        }
        params.insert("kwargs".to_string(), Value::Object(kwargs));
    }

    if options.route.as_deref() == Some(SEARCH_READ_ROUTE) {
        apply_search_read_controller(&caller, &mut params);
    }

    debug!(route = %route, method = ?options.method, param_count = params.len(), "normalized query");
    CanonicalQuery { route, params }
}

/// Explicit route, else the `call_kw` route for model and method, else empty.
pub fn resolve_route(options: &QueryOptions) -> String {
    if let Some(route) = options.route.as_deref() {
        return route.to_string();
    }
    match (options.model.as_deref(), options.method.as_deref()) {
        (Some(model), Some(method)) => format!("{CALL_KW_ROUTE_PREFIX}/{model}/{method}"),
        _ => String::new(),
    }
}

/// Detach the seed `kwargs` object, leaving its slot (and key position) in place.
fn take_kwargs(params: &mut Map<String, Value>) -> Map<String, Value> {
    match params.get_mut("kwargs").map(Value::take) {
        Some(Value::Object(kwargs)) => kwargs,
        _ => Map::new(),
    }
}

fn shape_call(
    options: &QueryOptions,
    method: &str,
    caller: &CallerValues,
    params: &mut Map<String, Value>,
    kwargs: &mut Map<String, Value>,
) {
    let args = options
        .args
        .as_ref()
        .map(|args| args.iter().map(snapshot_value).collect())
        .unwrap_or_default();
    params.insert("args".to_string(), Value::Array(args));
    set_or_remove(params, "model", caller.model.clone());
    params.insert("method".to_string(), Value::String(method.to_string()));

    for (key, value) in &options.kwargs {
        kwargs.insert(key.clone(), snapshot_value(value));
    }
    let context = first_defined([caller.context.as_ref(), params.get("context"), kwargs.get("context")]);
    set_or_remove(kwargs, "context", context);
}

fn apply_read_group(options: &QueryOptions, caller: &CallerValues, params: &Map<String, Value>, kwargs: &mut Map<String, Value>) {
    if !has_positional(params, 0) {
        let domain = first_defined_or([caller.domain.as_ref(), params.get("domain"), kwargs.get("domain")], json!([]));
        kwargs.insert("domain".to_string(), domain);
    }
    if !has_positional(params, 1) {
        let fields = first_defined_or([caller.fields.as_ref(), params.get("fields"), kwargs.get("fields")], json!([]));
        kwargs.insert("fields".to_string(), fields);
    }
    if !has_positional(params, 2) {
        let group_by = first_defined_or([caller.group_by.as_ref(), params.get("groupBy"), kwargs.get("groupby")], json!([]));
        kwargs.insert("groupby".to_string(), group_by);
    }

    let offset = first_defined([caller.offset.as_ref(), params.get("offset"), kwargs.get("offset")]);
    set_or_remove(kwargs, "offset", offset);
    let limit = first_defined([caller.limit.as_ref(), params.get("limit"), kwargs.get("limit")]);
    set_or_remove(kwargs, "limit", limit);

    // The server-side argument is `orderby`, all lowercase.
    let order_by = first_defined([caller.order_by.as_ref(), params.get("orderBy"), kwargs.get("orderby")]);
    set_or_remove(kwargs, "orderby", order_by.as_ref().map(serialize_sort_value));

    // An explicit `lazy` from the caller wins even when it is null.
    let lazy = match &options.lazy {
        Some(lazy) => Some(snapshot_value(lazy)),
        None => first_defined([params.get("lazy"), kwargs.get("lazy")]),
    };
    set_or_remove(kwargs, "lazy", lazy);
}

fn apply_search_read(caller: &CallerValues, params: &Map<String, Value>, kwargs: &mut Map<String, Value>) {
    let domain = first_defined([caller.domain.as_ref(), params.get("domain"), kwargs.get("domain")]);
    set_or_remove(kwargs, "domain", domain);
    let fields = first_defined([caller.fields.as_ref(), params.get("fields"), kwargs.get("fields")]);
    set_or_remove(kwargs, "fields", fields);
    let offset = first_defined([caller.offset.as_ref(), params.get("offset"), kwargs.get("offset")]);
    set_or_remove(kwargs, "offset", offset);
    let limit = first_defined([caller.limit.as_ref(), params.get("limit"), kwargs.get("limit")]);
    set_or_remove(kwargs, "limit", limit);

    // The server-side argument is `order`.
    let order = first_defined([caller.order_by.as_ref(), params.get("orderBy"), kwargs.get("order")]);
    set_or_remove(kwargs, "order", order.as_ref().map(serialize_sort_value));
}

fn apply_search_read_controller(caller: &CallerValues, params: &mut Map<String, Value>) {
    let model = first_defined([caller.model.as_ref(), params.get("model")]);
    set_or_remove(params, "model", model);
    let domain = first_defined([caller.domain.as_ref(), params.get("domain")]);
    set_or_remove(params, "domain", domain);
    let fields = first_defined([caller.fields.as_ref(), params.get("fields")]);
    set_or_remove(params, "fields", fields);
    let limit = first_defined([caller.limit.as_ref(), params.get("limit")]);
    set_or_remove(params, "limit", limit);
    let offset = first_defined([caller.offset.as_ref(), params.get("offset")]);
    set_or_remove(params, "offset", offset);

    let sort = first_defined([caller.order_by.as_ref(), params.get("orderBy"), params.get("sort")]);
    set_or_remove(params, "sort", sort.as_ref().map(serialize_sort_value));

    let context = first_defined_or([caller.context.as_ref(), params.get("context")], json!({}));
    params.insert("context".to_string(), context);
}
