//! Shared type definitions for the OdooRPC client crates.

mod auth;
mod query;
mod rpc;

pub use auth::AuthPayload;
pub use query::{CALL_KW_ROUTE_PREFIX, CanonicalQuery, LONGPOLLING_ROUTE, Limit, OrderSpec, QueryOptions, SEARCH_READ_ROUTE};
pub use rpc::{RpcErrorPayload, RpcRequest, RpcResponse, SESSION_EXPIRED_CODE};
