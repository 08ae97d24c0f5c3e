//! # OdooRPC Engine
//!
//! Query normalization for the OdooRPC client. The engine takes a loose
//! [`QueryOptions`](odoorpc_types::QueryOptions) description and produces the
//! canonical `(route, params)` pair for the server's calling conventions.
//!
//! ## Usage
//!
//! ```rust
//! use odoorpc_engine::normalize;
//! use odoorpc_types::{OrderSpec, QueryOptions};
//! use serde_json::json;
//!
//! let options = QueryOptions::call("res.partner", "search_read")
//!     .with_domain(json!([["is_company", "=", true]]))
//!     .with_fields(["id", "name"])
//!     .with_order_by(vec![OrderSpec::from("name")])
//!     .with_limit(80);
//!
//! let query = normalize(&options);
//! assert_eq!(query.route, "/web/dataset/call_kw/res.partner/search_read");
//! assert_eq!(query.params["kwargs"]["order"], json!("name ASC"));
//! ```
//!
//! ## Architecture
//!
//! - **`normalize`**: route resolution and per-convention shaping
//! - **`resolve`**: first-defined fallback chains
//! - **`sort`**: `ORDER BY` clause serialization
//! - **`snapshot`**: structural copies of params objects

pub mod normalize;
pub mod resolve;
pub mod snapshot;
pub mod sort;

pub use normalize::{normalize, resolve_route};
pub use snapshot::{snapshot_params, snapshot_value};
pub use sort::{serialize_sort, serialize_sort_value};
