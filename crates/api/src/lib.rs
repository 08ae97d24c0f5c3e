//! Odoo JSON-RPC client.
//!
//! This crate ties the pieces together:
//!
//! - [`ClientOptions`] describes the server and where credentials are stored
//! - [`AuthProvider`] reads and writes the session credential
//! - [`RpcTransport`] wraps calls in JSON-RPC envelopes with auth headers
//! - [`OdooClient`] normalizes queries and retries once on an expired session
//!
//! Query normalization itself lives in `odoorpc-engine`; the HTTP executor and
//! credential stores live in `odoorpc-util`.

mod auth;
mod client;
mod config;
mod error;
mod transport;

#[cfg(test)]
mod test_support;

pub use auth::{AuthProvider, BEARER_HEADER, DATABASE_HEADER, SESSION_HEADER, auth_headers};
pub use client::{EXCHANGE_TOKEN_ROUTE, OdooClient, REFRESH_TOKEN_ROUTE};
pub use config::{
    ClientOptions, DATA_KEY_ENV_VAR, DATABASE_ENV_VAR, DEFAULT_TOKEN_KEY, HOST_ENV_VAR, HTTPS_ENV_VAR, PORT_ENV_VAR,
    TOKEN_KEY_ENV_VAR,
};
pub use error::OdooError;
pub use transport::RpcTransport;
