//! # RPC Transport
//!
//! Wraps every call in a JSON-RPC `call` envelope, attaches the auth headers of
//! the current credential and posts it through an [`HttpExecutor`].
//!
//! The credential is resolved lazily from the [`AuthProvider`] and memoized in a
//! [`OnceCell`]. Concurrent first calls wait on the same resolution, so the
//! store is read once no matter how many requests start together. Login,
//! refresh and logout swap the cell instead of mutating it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use indexmap::IndexMap;
use odoorpc_types::{AuthPayload, RpcRequest};
use odoorpc_util::http::{HttpExecutor, HttpRequest, HttpResponse, TransportError};
use rand::Rng;
use reqwest::{Method, Url};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::OdooError;
use crate::auth::{AuthProvider, auth_headers};

type CredentialCell = Arc<OnceCell<Option<AuthPayload>>>;

pub struct RpcTransport {
    base_url: String,
    database: Option<String>,
    executor: Arc<dyn HttpExecutor>,
    auth: AuthProvider,
    credential: Mutex<CredentialCell>,
}

impl fmt::Debug for RpcTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcTransport")
            .field("base_url", &self.base_url)
            .field("database", &self.database)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl RpcTransport {
    pub fn new(base_url: impl Into<String>, database: Option<String>, executor: Arc<dyn HttpExecutor>, auth: AuthProvider) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            database,
            executor,
            auth,
            credential: Mutex::new(Arc::new(OnceCell::new())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthProvider {
        &self.auth
    }

    /// The current credential, reading the store on first use.
    ///
    /// A failed read leaves the cell empty so the next call tries again.
    pub async fn credential(&self) -> Result<Option<AuthPayload>, OdooError> {
        let cell = self.current_cell();
        let credential = cell.get_or_try_init(|| self.auth.resolve_credential()).await?;
        Ok(credential.clone())
    }

    /// Replace the memoized credential without touching the store.
    pub fn set_credential(&self, credential: Option<AuthPayload>) {
        *self.lock_cell() = Arc::new(OnceCell::new_with(Some(credential)));
    }

    /// Drop the memoized credential; the next call reads the store again.
    pub fn invalidate(&self) {
        *self.lock_cell() = Arc::new(OnceCell::new());
    }

    /// Absolute URL for `route`. Absolute `http(s)` targets are returned as is.
    pub fn url_for(&self, route: &str) -> Result<String, TransportError> {
        let route = route.trim();
        if route.starts_with("http://") || route.starts_with("https://") {
            return Ok(route.to_string());
        }
        let path = route.trim_start_matches('/');
        if path.is_empty() {
            return Err(TransportError::invalid_request("route must not be empty"));
        }
        Ok(format!("{}/{}", self.base_url, path))
    }

    /// Post `params` to `route` as the authenticated user.
    ///
    /// Returns the decoded response body. JSON-RPC errors in the body are left
    /// for the caller to interpret.
    pub async fn rpc(&self, route: &str, params: Map<String, Value>) -> Result<Value, OdooError> {
        let credential = self.credential().await?;
        self.post(route, params, credential.as_ref()).await
    }

    /// Post `params` to `route` without credentials, for token exchanges.
    pub async fn call_public(&self, route: &str, params: Map<String, Value>) -> Result<Value, OdooError> {
        self.post(route, params, None).await
    }

    /// Send an arbitrary request.
    ///
    /// Relative targets are joined with the base URL. Auth headers are only
    /// attached when the target shares the base URL's origin; absolute URLs on
    /// other hosts are sent bare. The response is returned whatever its status.
    pub async fn fetch(&self, method: Method, target: &str, body: Option<Value>) -> Result<HttpResponse, OdooError> {
        let url = self.url_for(target)?;
        let mut request = HttpRequest::new(method, url.as_str());
        if self.is_same_origin(&url) {
            let credential = self.credential().await?;
            request = request.with_headers(&self.headers_for(credential.as_ref()));
        } else {
            debug!(url = %url, "fetch target is off-origin, sending without credentials");
        }
        if let Some(body) = body {
            request = request.with_body(body);
        }
        Ok(self.executor.execute(request).await?)
    }

    async fn post(&self, route: &str, params: Map<String, Value>, credential: Option<&AuthPayload>) -> Result<Value, OdooError> {
        let url = self.url_for(route)?;
        let request_id = next_request_id();
        let envelope = serde_json::to_value(RpcRequest::call(params, request_id))?;
        let request = HttpRequest::post_json(url, envelope).with_headers(&self.headers_for(credential));

        let start = Instant::now();
        let response = self.executor.execute(request).await?;
        let duration_ms = start.elapsed().as_millis();

        if !response.is_success() && response.body.get("error").is_none() {
            warn!(route = %route, status = response.status, request_id, duration_ms, "rpc call failed");
            return Err(TransportError::status(response.status, &response.body.to_string()).into());
        }

        debug!(route = %route, status = response.status, request_id, duration_ms, "rpc call completed");
        Ok(response.body)
    }

    fn is_same_origin(&self, url: &str) -> bool {
        match (Url::parse(&self.base_url), Url::parse(url)) {
            (Ok(base), Ok(target)) => base.origin() == target.origin(),
            _ => false,
        }
    }

    fn headers_for(&self, credential: Option<&AuthPayload>) -> IndexMap<String, String> {
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.extend(auth_headers(credential, self.database.as_deref()));
        headers
    }

    fn current_cell(&self) -> CredentialCell {
        self.lock_cell().clone()
    }

    fn lock_cell(&self) -> MutexGuard<'_, CredentialCell> {
        self.credential.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn next_request_id() -> u64 {
    rand::thread_rng().gen_range(1..1_000_000_000)
}
