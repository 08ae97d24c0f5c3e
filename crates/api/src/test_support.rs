//! Test doubles for the executor and the credential store.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use odoorpc_util::http::{HttpExecutor, HttpRequest, HttpResponse, TransportError};
use odoorpc_util::keystore::{CredentialStore, MemoryStore, StoreError};

/// Executor that replays canned responses in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedExecutor {
    pub fn with_responses(responses: impl IntoIterator<Item = HttpResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn routes(&self) -> Vec<String> {
        self.requests().into_iter().map(|request| request.url).collect()
    }
}

#[async_trait]
impl HttpExecutor for ScriptedExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| TransportError::network("connection refused"))
    }
}

/// Memory store that counts reads and logs writes, optionally slow or broken.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    operations: Mutex<Vec<String>>,
    get_delay: Option<Duration>,
    failing: bool,
    failing_set_key: Option<String>,
}

impl RecordingStore {
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            inner: MemoryStore::with_entries(entries),
            ..Self::default()
        }
    }

    /// Store whose every operation fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Fail writes to `key` only.
    pub fn failing_on_set(mut self, key: &str) -> Self {
        self.failing_set_key = Some(key.to_string());
        self
    }

    pub fn with_get_delay_ms(mut self, millis: u64) -> Self {
        self.get_delay = Some(Duration::from_millis(millis));
        self
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Writes in order, as `set:<key>` and `remove:<key>`.
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().expect("operations lock").clone()
    }

    pub async fn value(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.expect("memory store")
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Keyring {
                key: key.to_string(),
                error: "keychain locked".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, operation: String) {
        self.operations.lock().expect("operations lock").push(operation);
    }
}

#[async_trait]
impl CredentialStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check(key)?;
        if self.failing_set_key.as_deref() == Some(key) {
            return Err(StoreError::Keyring {
                key: key.to_string(),
                error: "keychain write denied".to_string(),
            });
        }
        self.record(format!("set:{key}"));
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check(key)?;
        self.record(format!("remove:{key}"));
        self.inner.remove(key).await
    }
}
