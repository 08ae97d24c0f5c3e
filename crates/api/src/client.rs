//! Client facade: login, queries with one-shot session refresh, and polling.

use std::sync::Arc;

use odoorpc_engine::normalize;
use odoorpc_types::{AuthPayload, CanonicalQuery, LONGPOLLING_ROUTE, QueryOptions, RpcErrorPayload, RpcResponse};
use odoorpc_util::http::{HttpExecutor, HttpResponse, ReqwestExecutor};
use odoorpc_util::keystore::CredentialStore;
use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::auth::AuthProvider;
use crate::config::ClientOptions;
use crate::transport::RpcTransport;
use crate::OdooError;

pub const EXCHANGE_TOKEN_ROUTE: &str = "auth/exchange_token";
pub const REFRESH_TOKEN_ROUTE: &str = "auth/refresh_token";

/// Entry point for talking to an Odoo server.
///
/// ```no_run
/// # async fn run() -> Result<(), odoorpc_api::OdooError> {
/// use std::sync::Arc;
/// use odoorpc_api::{ClientOptions, OdooClient};
/// use odoorpc_types::QueryOptions;
/// use odoorpc_util::keystore::MemoryStore;
///
/// let options = ClientOptions::new("localhost").with_port(8069);
/// let client = OdooClient::new(&options, Arc::new(MemoryStore::new()))?;
/// client.login("admin", "admin").await?;
/// let partners = client
///     .query(&QueryOptions::call("res.partner", "search_read").with_fields(["name"]).with_limit(5))
///     .await?;
/// # let _ = partners;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OdooClient {
    transport: RpcTransport,
}

impl OdooClient {
    /// Client using the default `reqwest` executor.
    pub fn new(options: &ClientOptions, store: Arc<dyn CredentialStore>) -> Result<Self, OdooError> {
        let executor = ReqwestExecutor::new()?;
        Self::with_executor(options, store, Arc::new(executor))
    }

    pub fn with_executor(
        options: &ClientOptions,
        store: Arc<dyn CredentialStore>,
        executor: Arc<dyn HttpExecutor>,
    ) -> Result<Self, OdooError> {
        let base_url = options.base_url()?;
        let auth = AuthProvider::new(store, options.token_key.clone(), options.data_key.clone());
        Ok(Self {
            transport: RpcTransport::new(base_url, options.database.clone(), executor, auth),
        })
    }

    pub fn transport(&self) -> &RpcTransport {
        &self.transport
    }

    /// Raw credential exchange. Returns the response body untouched.
    pub async fn exchange_token(&self, login: &str, password: &str) -> Result<Value, OdooError> {
        let mut params = Map::new();
        params.insert("login".to_string(), json!(login));
        params.insert("password".to_string(), json!(password));
        self.transport.call_public(EXCHANGE_TOKEN_ROUTE, params).await
    }

    /// Exchange a login and password for a session and persist it.
    ///
    /// Nothing is written to the store unless the server hands back a usable
    /// credential. Once the credential is stored the session is live, even if
    /// writing the auxiliary payload fails afterwards.
    pub async fn login(&self, login: &str, password: &str) -> Result<AuthPayload, OdooError> {
        let result = match decode_response(self.exchange_token(login, password).await?)? {
            Ok(result) => result,
            Err(error) => {
                warn!(code = error.code, "login rejected");
                return Err(OdooError::invalid_credentials(error.message));
            }
        };
        let payload = credential_from_result(&result).ok_or_else(|| OdooError::invalid_credentials("Invalid login name or password"))?;

        self.transport.auth().persist(&payload).await?;
        self.transport.set_credential(Some(payload.clone()));
        info!(uid = ?payload.uid, "logged in");
        self.transport.auth().persist_user_data(&result).await?;
        Ok(payload)
    }

    /// Trade the cached refresh token for a new credential.
    pub async fn refresh(&self) -> Result<AuthPayload, OdooError> {
        let current = self.transport.credential().await?;
        let Some(refresh_token) = current.as_ref().and_then(|credential| credential.refresh_token.clone()) else {
            return Err(OdooError::LoginRequired);
        };

        let mut params = Map::new();
        params.insert("refresh_token".to_string(), json!(refresh_token));
        let response = decode_response(self.transport.call_public(REFRESH_TOKEN_ROUTE, params).await?)?;
        let mut payload = response
            .ok()
            .as_ref()
            .and_then(credential_from_result)
            .ok_or_else(|| OdooError::invalid_credentials("refresh token rejected"))?;
        if payload.refresh_token.is_none() {
            payload.refresh_token = Some(refresh_token);
        }

        self.transport.auth().replace(&payload).await?;
        self.transport.set_credential(Some(payload.clone()));
        debug!("session refreshed");
        Ok(payload)
    }

    /// Forget the stored session. Safe to call when already logged out.
    pub async fn logout(&self) -> Result<(), OdooError> {
        self.transport.auth().clear().await?;
        self.transport.set_credential(None);
        info!("logged out");
        Ok(())
    }

    /// Whether a credential is available. Store failures count as logged out.
    pub async fn is_logged_user(&self) -> bool {
        match self.transport.credential().await {
            Ok(credential) => credential.is_some(),
            Err(error) => {
                warn!(error = %error, "could not read stored credential");
                false
            }
        }
    }

    pub async fn check_logged_user(&self) -> Result<(), OdooError> {
        match self.transport.credential().await? {
            Some(_) => Ok(()),
            None => Err(OdooError::LoginRequired),
        }
    }

    /// Auxiliary login payload, when a data key is configured.
    pub async fn user_data(&self) -> Result<Option<Value>, OdooError> {
        self.transport.auth().user_data().await
    }

    /// Normalize `options` and execute the resulting call.
    pub async fn query(&self, options: &QueryOptions) -> Result<Value, OdooError> {
        let query = normalize(options);
        self.execute(&query).await
    }

    /// Execute an already normalized call.
    ///
    /// An expired session (code 100) triggers one refresh and one retry of the
    /// same request. Any other error, or a second expiry, is returned as is.
    pub async fn execute(&self, query: &CanonicalQuery) -> Result<Value, OdooError> {
        match self.call_once(query).await? {
            Ok(result) => Ok(result),
            Err(error) if error.is_session_expired() => {
                warn!(route = %query.route, code = error.code, attempt = 1, "session expired, refreshing");
                self.refresh().await?;
                self.call_once(query).await?.map_err(|error| {
                    warn!(route = %query.route, code = error.code, attempt = 2, "rpc call failed after refresh");
                    OdooError::RemoteError(error)
                })
            }
            Err(error) => {
                debug!(route = %query.route, code = error.code, "rpc call returned an error");
                Err(OdooError::RemoteError(error))
            }
        }
    }

    /// Long-poll the bus for `channels` after message id `last`.
    pub async fn poll(&self, channels: Vec<String>, last: u64) -> Result<Value, OdooError> {
        let mut params = Map::new();
        params.insert("channels".to_string(), json!(channels));
        params.insert("last".to_string(), json!(last));
        self.query(&QueryOptions::route(LONGPOLLING_ROUTE).with_params(params)).await
    }

    pub async fn poll_default(&self) -> Result<Value, OdooError> {
        self.poll(Vec::new(), 0).await
    }

    /// Send an arbitrary request with the session's auth headers.
    pub async fn fetch(&self, method: Method, target: &str, body: Option<Value>) -> Result<HttpResponse, OdooError> {
        self.transport.fetch(method, target, body).await
    }

    async fn call_once(&self, query: &CanonicalQuery) -> Result<Result<Value, RpcErrorPayload>, OdooError> {
        let body = self.transport.rpc(&query.route, query.params.clone()).await?;
        decode_response(body)
    }
}

fn decode_response(body: Value) -> Result<Result<Value, RpcErrorPayload>, OdooError> {
    if !body.is_object() {
        return Err(OdooError::malformed_response("expected a JSON-RPC response object"));
    }
    let response: RpcResponse =
        serde_json::from_value(body).map_err(|error| OdooError::malformed_response(format!("invalid JSON-RPC response: {error}")))?;
    Ok(response.into_result())
}

/// Credential carried by a login or refresh result, if any.
fn credential_from_result(result: &Value) -> Option<AuthPayload> {
    let payload = match result {
        Value::Object(_) => serde_json::from_value::<AuthPayload>(result.clone()).ok()?,
        Value::String(session_id) => AuthPayload::session(session_id.clone()),
        _ => return None,
    };
    payload.has_credential().then_some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SESSION_HEADER;
    use crate::test_support::{RecordingStore, ScriptedExecutor};
    use odoorpc_util::http::TransportError;

    const TOKEN_KEY: &str = "odoorpc.session";

    fn client(executor: &Arc<ScriptedExecutor>, store: &Arc<RecordingStore>) -> OdooClient {
        let options = ClientOptions::new("localhost").with_port(8069).with_data_key("odoorpc.user");
        OdooClient::with_executor(&options, store.clone(), executor.clone()).expect("client")
    }

    fn ok(result: Value) -> HttpResponse {
        HttpResponse::json(200, json!({"jsonrpc": "2.0", "id": 1, "result": result}))
    }

    fn rpc_error(code: i64, message: &str) -> HttpResponse {
        HttpResponse::json(200, json!({"jsonrpc": "2.0", "id": 1, "error": {"code": code, "message": message}}))
    }

    fn refreshable_store() -> Arc<RecordingStore> {
        Arc::new(RecordingStore::with_entries([(
            TOKEN_KEY,
            r#"{"session_id":"old-sid","refresh_token":"refresh-1"}"#,
        )]))
    }

    #[tokio::test]
    async fn login_persists_token_and_user_data() {
        let executor = Arc::new(ScriptedExecutor::with_responses([ok(json!({"token": "sid-1", "uid": 2}))]));
        let store = Arc::new(RecordingStore::default());
        let client = client(&executor, &store);

        let payload = client.login("admin", "admin").await.expect("login");

        assert_eq!(payload.session_id.as_deref(), Some("sid-1"));
        assert!(client.is_logged_user().await);
        assert_eq!(store.get_count(), 0);
        assert_eq!(client.user_data().await.expect("user data"), Some(json!({"token": "sid-1", "uid": 2})));

        let request = executor.requests().remove(0);
        assert_eq!(request.url, "http://localhost:8069/auth/exchange_token");
        assert_eq!(request.body.expect("body")["params"], json!({"login": "admin", "password": "admin"}));
    }

    #[tokio::test]
    async fn login_stays_live_when_user_data_write_fails() {
        let executor = Arc::new(ScriptedExecutor::with_responses([ok(json!({"token": "sid-1", "uid": 2}))]));
        let store = Arc::new(RecordingStore::default().failing_on_set("odoorpc.user"));
        let client = client(&executor, &store);
        client.logout().await.expect("start logged out");

        let error = client.login("admin", "admin").await.expect_err("user data write fails");

        assert!(matches!(error, OdooError::Store(_)));
        assert!(store.value(TOKEN_KEY).await.is_some());
        assert!(client.is_logged_user().await);
        assert_eq!(store.get_count(), 0);
    }

    #[tokio::test]
    async fn failed_login_leaves_store_untouched() {
        let executor = Arc::new(ScriptedExecutor::with_responses([
            ok(json!({"uid": false})),
            rpc_error(200, "Access Denied"),
        ]));
        let store = Arc::new(RecordingStore::default());
        let client = client(&executor, &store);

        let missing_token = client.login("admin", "wrong").await.expect_err("no token");
        let rejected = client.login("admin", "wrong").await.expect_err("rejected");

        assert!(matches!(missing_token, OdooError::InvalidCredentials { .. }));
        assert!(matches!(rejected, OdooError::InvalidCredentials { .. }));
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn query_normalizes_and_returns_result() {
        let executor = Arc::new(ScriptedExecutor::with_responses([ok(json!([{"id": 3, "name": "Deco Addict"}]))]));
        let store = Arc::new(RecordingStore::with_entries([(TOKEN_KEY, "sid-1")]));
        let client = client(&executor, &store);

        let options = QueryOptions::call("res.partner", "search_read").with_fields(["name"]).with_limit(1);
        let result = client.query(&options).await.expect("query");

        assert_eq!(result, json!([{"id": 3, "name": "Deco Addict"}]));
        let request = executor.requests().remove(0);
        assert_eq!(request.url, "http://localhost:8069/web/dataset/call_kw/res.partner/search_read");
        assert_eq!(request.headers.get(SESSION_HEADER).map(String::as_str), Some("sid-1"));
        assert_eq!(request.body.expect("body")["params"]["kwargs"]["limit"], json!(1));
    }

    #[tokio::test]
    async fn expired_session_refreshes_once_and_retries() {
        let executor = Arc::new(ScriptedExecutor::with_responses([
            rpc_error(100, "Odoo Session Expired"),
            ok(json!({"session_id": "new-sid"})),
            ok(json!(42)),
        ]));
        let store = refreshable_store();
        let client = client(&executor, &store);

        let result = client.query(&QueryOptions::call("res.partner", "search_count").with_args(vec![json!([])])).await;

        assert_eq!(result.expect("retried"), json!(42));
        let routes = executor.routes();
        assert_eq!(
            routes,
            vec![
                "http://localhost:8069/web/dataset/call_kw/res.partner/search_count",
                "http://localhost:8069/auth/refresh_token",
                "http://localhost:8069/web/dataset/call_kw/res.partner/search_count",
            ]
        );
        let requests = executor.requests();
        assert_eq!(requests[0].body.as_ref().map(|body| &body["params"]), requests[2].body.as_ref().map(|body| &body["params"]));
        assert_eq!(requests[1].body.as_ref().expect("body")["params"], json!({"refresh_token": "refresh-1"}));
        assert_eq!(requests[2].headers.get(SESSION_HEADER).map(String::as_str), Some("new-sid"));
        assert_eq!(store.operations(), vec![format!("remove:{TOKEN_KEY}"), format!("set:{TOKEN_KEY}")]);

        let stored = AuthPayload::from_stored(&store.value(TOKEN_KEY).await.expect("stored")).expect("payload");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn second_session_expiry_is_returned_without_another_refresh() {
        let executor = Arc::new(ScriptedExecutor::with_responses([
            rpc_error(100, "Odoo Session Expired"),
            ok(json!({"session_id": "new-sid", "refresh_token": "refresh-2"})),
            rpc_error(100, "Odoo Session Expired"),
        ]));
        let store = refreshable_store();
        let client = client(&executor, &store);

        let error = client.query(&QueryOptions::route("/web/session/get_session_info")).await.expect_err("expired");

        assert_eq!(error.remote_code(), Some(100));
        assert_eq!(executor.requests().len(), 3);
    }

    #[tokio::test]
    async fn other_remote_errors_are_not_retried() {
        let executor = Arc::new(ScriptedExecutor::with_responses([rpc_error(200, "Odoo Server Error")]));
        let store = refreshable_store();
        let client = client(&executor, &store);

        let error = client.query(&QueryOptions::call("res.partner", "unlink")).await.expect_err("remote error");

        match error {
            OdooError::RemoteError(payload) => assert_eq!(payload.message, "Odoo Server Error"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(executor.requests().len(), 1);
        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_is_returned_instead_of_the_expiry() {
        let executor = Arc::new(ScriptedExecutor::with_responses([
            rpc_error(100, "Odoo Session Expired"),
            rpc_error(401, "Invalid refresh token"),
        ]));
        let store = refreshable_store();
        let client = client(&executor, &store);

        let error = client.query(&QueryOptions::route("/web/session/get_session_info")).await.expect_err("refresh failed");

        assert!(matches!(error, OdooError::InvalidCredentials { ref reason } if reason == "refresh token rejected"));
        assert_eq!(executor.requests().len(), 2);
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_requires_login() {
        let executor = Arc::new(ScriptedExecutor::default());
        let store = Arc::new(RecordingStore::with_entries([(TOKEN_KEY, "sid-1")]));
        let client = client(&executor, &store);

        assert!(matches!(client.refresh().await, Err(OdooError::LoginRequired)));
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn concurrent_queries_share_one_credential_read() {
        let executor = Arc::new(ScriptedExecutor::with_responses([ok(json!(1)), ok(json!(2))]));
        let store = Arc::new(RecordingStore::with_entries([(TOKEN_KEY, "sid-1")]).with_get_delay_ms(20));
        let client = client(&executor, &store);

        let first = QueryOptions::call("res.partner", "search_count");
        let second = QueryOptions::call("res.users", "search_count");
        let (a, b) = tokio::join!(client.query(&first), client.query(&second));

        a.expect("first query");
        b.expect("second query");
        assert_eq!(store.get_count(), 1);
    }

    #[tokio::test]
    async fn logout_clears_keys_and_is_idempotent() {
        let executor = Arc::new(ScriptedExecutor::default());
        let store = Arc::new(RecordingStore::with_entries([(TOKEN_KEY, "sid-1"), ("odoorpc.user", "{}")]));
        let client = client(&executor, &store);

        client.logout().await.expect("logout");
        client.logout().await.expect("second logout");

        assert_eq!(store.value(TOKEN_KEY).await, None);
        assert_eq!(store.value("odoorpc.user").await, None);
        assert!(!client.is_logged_user().await);
        assert!(matches!(client.check_logged_user().await, Err(OdooError::LoginRequired)));
    }

    #[tokio::test]
    async fn store_failure_reads_as_logged_out() {
        let executor = Arc::new(ScriptedExecutor::default());
        let store = Arc::new(RecordingStore::failing());
        let client = client(&executor, &store);

        assert!(!client.is_logged_user().await);
        assert!(matches!(client.check_logged_user().await, Err(OdooError::Store(_))));
    }

    #[tokio::test]
    async fn poll_default_posts_empty_channels() {
        let executor = Arc::new(ScriptedExecutor::with_responses([ok(json!([]))]));
        let store = Arc::new(RecordingStore::with_entries([(TOKEN_KEY, "sid-1")]));
        let client = client(&executor, &store);

        assert_eq!(client.poll_default().await.expect("poll"), json!([]));

        let request = executor.requests().remove(0);
        assert_eq!(request.url, "http://localhost:8069/longpolling/poll");
        assert_eq!(request.body.expect("body")["params"], json!({"channels": [], "last": 0}));
    }

    #[tokio::test]
    async fn network_failures_surface_as_transport_errors() {
        let executor = Arc::new(ScriptedExecutor::default());
        let store = Arc::new(RecordingStore::with_entries([(TOKEN_KEY, "sid-1")]));
        let client = client(&executor, &store);

        let error = client.query(&QueryOptions::call("res.partner", "read")).await.expect_err("network");

        assert!(matches!(error, OdooError::TransportFailure(TransportError::Network { .. })));
    }

    #[tokio::test]
    async fn non_object_body_is_malformed() {
        let executor = Arc::new(ScriptedExecutor::with_responses([HttpResponse::json(200, json!("<html>"))]));
        let store = Arc::new(RecordingStore::with_entries([(TOKEN_KEY, "sid-1")]));
        let client = client(&executor, &store);

        let error = client.query(&QueryOptions::call("res.partner", "read")).await.expect_err("malformed");

        assert!(matches!(error, OdooError::MalformedResponse { .. }));
    }
}
