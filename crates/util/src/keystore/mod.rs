//! Credential storage.
//!
//! The session provider persists credentials through a [`CredentialStore`]:
//! the OS keychain for the CLI, memory for embedding and tests, or nothing at
//! all. Removing a key that is not stored is never an error.

mod keychain;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

pub use keychain::KeychainStore;

/// Environment variable used to select the credential store backend.
pub const STORE_BACKEND_ENV_VAR: &str = "ODOORPC_STORE";

/// Keychain service name used by the CLI.
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "odoorpc";

/// Errors raised by a credential store.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("Keyring error for {key}: {error}")]
    Keyring { key: String, error: String },

    #[error("Credential store task failed for {key}: {error}")]
    Task { key: String, error: String },
}

/// Asynchronous key-value store for credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the value stored under `key`, or `None` when nothing is stored.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Succeeds when the key is already absent.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(entries.into_iter().map(|(key, value)| (key.into(), value.into())).collect()),
        }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Store that keeps nothing: reads are always empty and writes are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl CredentialStore for NoopStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Credential store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// OS keychain via `keyring-rs`.
    Keychain,
    /// Process memory; credentials are gone when the process exits.
    Memory,
    /// No persistence at all.
    Noop,
}

impl StoreBackend {
    fn from_env_var(raw: Option<String>) -> Self {
        match raw.unwrap_or_default().trim().to_ascii_lowercase().as_str() {
            "memory" => Self::Memory,
            "none" | "noop" => Self::Noop,
            _ => Self::Keychain,
        }
    }

    /// Build the store for this backend.
    pub fn build(self, keychain_service: &str) -> Arc<dyn CredentialStore> {
        match self {
            Self::Keychain => Arc::new(KeychainStore::new(keychain_service)),
            Self::Memory => Arc::new(MemoryStore::new()),
            Self::Noop => Arc::new(NoopStore),
        }
    }
}

/// Determine the configured store backend from [`STORE_BACKEND_ENV_VAR`].
pub fn store_backend() -> StoreBackend {
    StoreBackend::from_env_var(std::env::var(STORE_BACKEND_ENV_VAR).ok())
}
