//! Client configuration.
//!
//! The server address is assembled from a host, an optional port and a scheme
//! flag, and validated before any request is built. Everything can be read from
//! `ODOO_*` environment variables.

use std::env;

use reqwest::Url;

use crate::OdooError;

/// Store key the primary credential is written under unless configured otherwise.
pub const DEFAULT_TOKEN_KEY: &str = "odoorpc.session";

pub const HOST_ENV_VAR: &str = "ODOO_HOST";
pub const PORT_ENV_VAR: &str = "ODOO_PORT";
pub const HTTPS_ENV_VAR: &str = "ODOO_HTTPS";
pub const DATABASE_ENV_VAR: &str = "ODOO_DATABASE";
pub const TOKEN_KEY_ENV_VAR: &str = "ODOO_TOKEN_KEY";
pub const DATA_KEY_ENV_VAR: &str = "ODOO_DATA_KEY";

/// Connection and credential-storage settings for an [`OdooClient`](crate::OdooClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Host name, optionally with a scheme (`https://erp.example.com`).
    pub host: String,
    pub port: Option<u16>,
    /// Scheme used when `host` does not carry one.
    pub https: bool,
    /// Database name sent as `X-Database-Name` on multi-tenant servers.
    pub database: Option<String>,
    /// Store key of the primary credential.
    pub token_key: String,
    /// Store key of the auxiliary login payload, if it should be kept.
    pub data_key: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            https: false,
            database: None,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            data_key: None,
        }
    }
}

impl ClientOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_token_key(mut self, token_key: impl Into<String>) -> Self {
        self.token_key = token_key.into();
        self
    }

    pub fn with_data_key(mut self, data_key: impl Into<String>) -> Self {
        self.data_key = Some(data_key.into());
        self
    }

    /// Read options from `ODOO_*` environment variables, falling back to the defaults.
    pub fn from_env() -> Result<Self, OdooError> {
        let defaults = Self::default();
        let port = match non_empty_var(PORT_ENV_VAR) {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .map_err(|error| OdooError::config(format!("{PORT_ENV_VAR} '{raw}' is not a valid port: {error}")))?,
            ),
            None => None,
        };
        Ok(Self {
            host: non_empty_var(HOST_ENV_VAR).unwrap_or(defaults.host),
            port,
            https: non_empty_var(HTTPS_ENV_VAR).is_some_and(|raw| parse_flag(&raw)),
            database: non_empty_var(DATABASE_ENV_VAR),
            token_key: non_empty_var(TOKEN_KEY_ENV_VAR).unwrap_or(defaults.token_key),
            data_key: non_empty_var(DATA_KEY_ENV_VAR),
        })
    }

    /// Server base URL without a trailing slash, e.g. `http://localhost:8069`.
    pub fn base_url(&self) -> Result<String, OdooError> {
        let host = self.host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(OdooError::config("server host must not be empty"));
        }
        let with_scheme = if host.contains("://") {
            host.to_string()
        } else {
            let scheme = if self.https { "https" } else { "http" };
            format!("{scheme}://{host}")
        };
        let base_url = match self.port {
            Some(port) => format!("{with_scheme}:{port}"),
            None => with_scheme,
        };
        validate_base_url(&base_url)?;
        Ok(base_url)
    }
}

/// Validate that a base URL is usable: it must parse, use http(s) and name a host.
fn validate_base_url(base: &str) -> Result<(), OdooError> {
    let parsed_base_url = Url::parse(base).map_err(|e| OdooError::config(format!("Invalid server URL '{}': {}", base, e)))?;

    if !matches!(parsed_base_url.scheme(), "http" | "https") {
        return Err(OdooError::config(format!(
            "server URL must use http or https; got '{}://'",
            parsed_base_url.scheme()
        )));
    }
    if parsed_base_url.host_str().is_none() {
        return Err(OdooError::config(format!("server URL '{}' must include a host", base)));
    }
    Ok(())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
