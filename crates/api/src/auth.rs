//! Session credential persistence and header selection.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use odoorpc_types::AuthPayload;
use odoorpc_util::keystore::CredentialStore;
use serde_json::Value;
use tracing::debug;

use crate::OdooError;

pub const SESSION_HEADER: &str = "X-Openerp-Session-Id";
pub const BEARER_HEADER: &str = "Authentication";
pub const DATABASE_HEADER: &str = "X-Database-Name";

/// Reads and writes the session credential through a [`CredentialStore`].
///
/// The primary credential lives under `token_key`. When `data_key` is set, the
/// raw login result is kept there as well so callers can read user metadata
/// without another round trip.
///
/// The provider does no caching; the transport memoizes the resolved value.
#[derive(Clone)]
pub struct AuthProvider {
    store: Arc<dyn CredentialStore>,
    token_key: String,
    data_key: Option<String>,
}

impl fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthProvider")
            .field("token_key", &self.token_key)
            .field("data_key", &self.data_key)
            .finish_non_exhaustive()
    }
}

impl AuthProvider {
    pub fn new(store: Arc<dyn CredentialStore>, token_key: impl Into<String>, data_key: Option<String>) -> Self {
        Self {
            store,
            token_key: token_key.into(),
            data_key,
        }
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    pub fn data_key(&self) -> Option<&str> {
        self.data_key.as_deref()
    }

    /// Read the stored credential. One store read per call.
    pub async fn resolve_credential(&self) -> Result<Option<AuthPayload>, OdooError> {
        let stored = self.store.get(&self.token_key).await?;
        let payload = stored.as_deref().and_then(AuthPayload::from_stored);
        debug!(token_key = %self.token_key, found = payload.is_some(), "resolved stored credential");
        Ok(payload)
    }

    /// Persist a fresh credential under the token key.
    pub async fn persist(&self, payload: &AuthPayload) -> Result<(), OdooError> {
        self.store.set(&self.token_key, &payload.to_stored()?).await?;
        Ok(())
    }

    /// Persist the auxiliary login payload. A no-op without a data key.
    pub async fn persist_user_data(&self, user_data: &Value) -> Result<(), OdooError> {
        if let Some(data_key) = self.data_key.as_deref() {
            self.store.set(data_key, &user_data.to_string()).await?;
        }
        Ok(())
    }

    /// Swap the stored credential: the old value is removed before the new one is written.
    pub async fn replace(&self, payload: &AuthPayload) -> Result<(), OdooError> {
        self.store.remove(&self.token_key).await?;
        self.store.set(&self.token_key, &payload.to_stored()?).await?;
        Ok(())
    }

    /// Remove the credential and the auxiliary payload. Missing keys are fine.
    pub async fn clear(&self) -> Result<(), OdooError> {
        self.store.remove(&self.token_key).await?;
        if let Some(data_key) = self.data_key.as_deref() {
            self.store.remove(data_key).await?;
        }
        Ok(())
    }

    /// The auxiliary payload stored at login, if any.
    pub async fn user_data(&self) -> Result<Option<Value>, OdooError> {
        let Some(data_key) = self.data_key.as_deref() else {
            return Ok(None);
        };
        match self.store.get(data_key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

/// Headers that authenticate a request for `credential`.
///
/// A bearer token takes precedence over a session id. The database header uses
/// the configured database, else the one recorded in the credential.
pub fn auth_headers(credential: Option<&AuthPayload>, database: Option<&str>) -> IndexMap<String, String> {
    let mut headers = IndexMap::new();
    if let Some(credential) = credential {
        if let Some(token) = credential.access_token.as_deref().filter(|token| !token.is_empty()) {
            headers.insert(BEARER_HEADER.to_string(), format!("Bearer {token}"));
        } else if let Some(session_id) = credential.session_id.as_deref().filter(|id| !id.is_empty()) {
            headers.insert(SESSION_HEADER.to_string(), session_id.to_string());
        }
    }
    if let Some(database) = database.or_else(|| credential.and_then(|credential| credential.database.as_deref())) {
        headers.insert(DATABASE_HEADER.to_string(), database.to_string());
    }
    headers
}
