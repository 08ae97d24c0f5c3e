//! # HTTP Executor
//!
//! The transport never talks to `reqwest` directly; it hands a fully built
//! [`HttpRequest`] to an [`HttpExecutor`] and gets the status, headers and
//! parsed JSON body back. [`ReqwestExecutor`] is the production executor; tests
//! substitute scripted ones.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{Client, Method};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::parser::{JsonParseError, parse_response_json_strict, status_error_message, truncate_response_preview};

/// Default request timeout applied by [`ReqwestExecutor::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outbound request handed to an executor.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Header names and values in insertion order.
    pub headers: IndexMap<String, String>,
    /// JSON body, sent with `Content-Type: application/json` when present.
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: IndexMap::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: &IndexMap<String, String>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response returned by an executor.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    /// Parsed JSON body; `Value::Null` for an empty body.
    pub body: Value,
}

impl HttpResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: IndexMap::new(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the JSON-RPC layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {message}. Hint: check the server URL and your connection/proxy")]
    Network { message: String },

    #[error("HTTP {status}: {body_preview}{}", hint_suffix(.hint))]
    Status {
        status: u16,
        body_preview: String,
        /// Likely cause for statuses that usually mean a misconfigured client.
        hint: Option<String>,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error(transparent)]
    Decode(#[from] JsonParseError),
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    /// Non-success status with a redacted, truncated preview of `body`.
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body_preview: truncate_response_preview(&crate::redact_sensitive(body), 200),
            hint: status_error_message(status),
        }
    }
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_deref().map(|hint| format!(" ({hint})")).unwrap_or_default()
}

/// Display `error` followed by each of its sources.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Executes one HTTP request.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpExecutor`] backed by a shared `reqwest::Client`.
///
/// The default client keeps a cookie store, so servers that answer a login with
/// a `session_id` cookie keep working even without the explicit session header.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    /// Build an executor with a cookie store and [`DEFAULT_TIMEOUT`].
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|error| TransportError::network(format!("could not build the HTTP client: {error}")))?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let start = Instant::now();
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        debug!(method = %method, url = %url, has_body = body.is_some(), "http request started");

        let mut builder = self.client.request(method.clone(), &url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|error| {
            warn!(method = %method, url = %url, error = %error, duration_ms = start.elapsed().as_millis(), "http request failed");
            if error.is_builder() {
                TransportError::invalid_request(error_chain(&error))
            } else {
                TransportError::network(error_chain(&error))
            }
        })?;

        let status = response.status();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string())))
            .collect::<IndexMap<_, _>>();
        let text = response.text().await.map_err(|error| TransportError::network(error.to_string()))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match parse_response_json_strict(&text, Some(status)) {
                Ok(value) => value,
                Err(_) if !status.is_success() => {
                    warn!(method = %method, url = %url, status = %status, duration_ms = start.elapsed().as_millis(), "http request returned a non-JSON error page");
                    return Err(TransportError::status(status.as_u16(), &text));
                }
                Err(error) => return Err(error.into()),
            }
        };

        debug!(
            method = %method,
            url = %url,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "http request completed"
        );
        Ok(HttpResponse {
            status: status.as_u16(),
            headers: response_headers,
            body,
        })
    }
}
