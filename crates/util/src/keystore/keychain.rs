//! OS keychain store.

use async_trait::async_trait;
use tracing::debug;

use super::{CredentialStore, StoreError};

/// [`CredentialStore`] backed by the OS keychain (`keyring-rs`).
///
/// Store keys become keychain account names under one service. Keychain calls
/// block, so each one runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    async fn run_blocking<T, F>(&self, key: &str, operation: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let account = key.to_string();
        let task = tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &account)?;
            operation(entry)
        });
        match task.await {
            Ok(result) => result.map_err(|error| StoreError::Keyring {
                key: key.to_string(),
                error: error.to_string(),
            }),
            Err(error) => Err(StoreError::Task {
                key: key.to_string(),
                error: error.to_string(),
            }),
        }
    }
}

#[async_trait]
impl CredentialStore for KeychainStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.run_blocking(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(error),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.to_string();
        self.run_blocking(key, move |entry| entry.set_password(&value)).await?;
        debug!("Stored credential in keychain: {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.run_blocking(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(error),
        })
        .await?;
        debug!("Removed credential from keychain: {}", key);
        Ok(())
    }
}
