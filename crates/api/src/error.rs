//! Error type for client operations.

use odoorpc_types::RpcErrorPayload;
use odoorpc_util::http::TransportError;
use odoorpc_util::keystore::StoreError;
use thiserror::Error;

/// Errors surfaced by [`OdooClient`](crate::OdooClient) and the transport.
#[derive(Debug, Error)]
pub enum OdooError {
    /// The server rejected a login or a refresh token.
    #[error("Invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    /// No credential is stored for an operation that needs one.
    #[error("Login required")]
    LoginRequired,

    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// A well-formed JSON-RPC error returned by the server, passed through untouched.
    #[error("Remote error: {0}")]
    RemoteError(RpcErrorPayload),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OdooError {
    pub fn invalid_credentials(reason: impl Into<String>) -> Self {
        Self::InvalidCredentials { reason: reason.into() }
    }

    pub fn malformed_response(reason: impl Into<String>) -> Self {
        Self::MalformedResponse { reason: reason.into() }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }

    /// The JSON-RPC error code, when this is a remote error.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            Self::RemoteError(payload) => Some(payload.code),
            _ => None,
        }
    }
}
