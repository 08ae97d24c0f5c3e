//! Credential payload shared by the session provider and the transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Credentials for an authenticated session.
///
/// Deployments hand out either a plain session id or a structured payload with
/// a bearer token and refresh token; both fit this one shape. The exchange
/// endpoint's `token` key is accepted as the session id, and `db` as the
/// database name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(default, alias = "token", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Bearer token sent in the `Authentication` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(default, alias = "db", skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Anything else the server returned alongside the credentials.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl AuthPayload {
    /// Payload carrying only a session id.
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    /// Payload carrying a bearer token and an optional refresh token.
    pub fn bearer(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
            ..Self::default()
        }
    }

    /// Whether the payload can authenticate a request at all.
    pub fn has_credential(&self) -> bool {
        self.session_id.as_deref().is_some_and(|id| !id.is_empty())
            || self.access_token.as_deref().is_some_and(|token| !token.is_empty())
    }

    /// Parse a stored credential.
    ///
    /// Stored values are JSON payloads; a bare string that is not a JSON object
    /// is read as a plain session id. Returns `None` for blank input or a payload
    /// without a usable credential.
    pub fn from_stored(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let payload = match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => serde_json::from_value::<Self>(value).ok()?,
            Ok(Value::String(session_id)) => Self::session(session_id),
            _ => Self::session(trimmed),
        };
        payload.has_credential().then_some(payload)
    }

    /// Serialized form written to the credential store.
    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
