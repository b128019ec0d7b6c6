//! Device-local persistence for the session credential pair
//!
//! Two fixed keys hold the access and refresh tokens. Reads fail safe: any
//! storage error is logged and surfaces as "no token", so a broken device
//! store degrades the app to an anonymous session instead of an error path.
//!
//! # Example
//!
//! ```rust,no_run
//! use foodshare_auth::TokenStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tokens = TokenStore::in_memory();
//!     tokens.set_tokens("access", "refresh").await;
//!     assert_eq!(tokens.access_token().await.as_deref(), Some("access"));
//! }
//! ```

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Storage key for the access token
const ACCESS_TOKEN_KEY: &str = "foodshare.auth.access_token";

/// Storage key for the refresh token
const REFRESH_TOKEN_KEY: &str = "foodshare.auth.refresh_token";

/// Abstract device key-value store
///
/// Implemented over whatever the platform offers: a keychain bridge, secure
/// preferences, or plain files in development.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value by key
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value under a key
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key (removing an absent key is not an error)
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and simulators
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// File-per-key store under a device-local directory
///
/// Development stand-in for platform secure storage: each key maps to one
/// file, with non-alphanumeric characters in the key name sanitized away.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Create a store rooted at the given directory
    ///
    /// The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create a store under the platform data directory
    /// (`~/.local/share/foodshare/session` on Linux)
    #[must_use]
    pub fn default_location() -> Self {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".foodshare"))
            .join("foodshare")
            .join("session");
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(name)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Access to the persisted credential pair
///
/// Cheap to clone; clones share the underlying store. All operations are
/// infallible at the signature level: storage failures are logged, reads
/// return `None`, and the app continues as signed out.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Create a token store over the given backend
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Token store that keeps nothing across process restarts
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    /// Token store on the platform data directory
    #[must_use]
    pub fn on_device() -> Self {
        Self::new(Arc::new(FileKeyValueStore::default_location()))
    }

    /// Read the access token, `None` when absent or unreadable
    pub async fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY).await
    }

    /// Read the refresh token, `None` when absent or unreadable
    pub async fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY).await
    }

    /// Persist a full credential pair (sign-in, or a rotating refresh)
    ///
    /// The two writes are independent and not atomic: if the device store
    /// fails between them the pair can tear. Callers treat the refresh token
    /// as the source of truth for session liveness.
    pub async fn set_tokens(&self, access: &str, refresh: &str) {
        let (access_result, refresh_result) = tokio::join!(
            self.store.set(ACCESS_TOKEN_KEY, access),
            self.store.set(REFRESH_TOKEN_KEY, refresh),
        );
        if let Err(e) = access_result {
            warn!(error = %e, "failed to persist access token");
        }
        if let Err(e) = refresh_result {
            warn!(error = %e, "failed to persist refresh token");
        }
    }

    /// Persist only the access token (the server kept the refresh token)
    pub async fn set_access_token(&self, access: &str) {
        if let Err(e) = self.store.set(ACCESS_TOKEN_KEY, access).await {
            warn!(error = %e, "failed to persist access token");
        }
    }

    /// Remove both credentials
    pub async fn clear(&self) {
        let (access_result, refresh_result) = tokio::join!(
            self.store.remove(ACCESS_TOKEN_KEY),
            self.store.remove(REFRESH_TOKEN_KEY),
        );
        if let Err(e) = access_result {
            warn!(error = %e, "failed to remove access token");
        }
        if let Err(e) = refresh_result {
            warn!(error = %e, "failed to remove refresh token");
        }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "token read failed, treating as signed out");
                None
            }
        }
    }
}
