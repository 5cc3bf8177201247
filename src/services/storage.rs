//! Object storage — opaque byte store behind a trait.
//!
//! DESIGN
//! ======
//! Uploaded and processed images are blobs keyed by `images/<uuid>`. The
//! trait keeps route and pipeline code independent of the backing store:
//! production uses the filesystem store, tests use the in-memory store.
//! No listing, no caching, no eviction — callers always know the exact key.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use uuid::Uuid;

/// Key prefix all stored objects live under. Routes reject anything
/// outside this namespace.
pub const OBJECT_PREFIX: &str = "images/";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mint a fresh object key under the `images/` prefix.
#[must_use]
pub fn object_key() -> String {
    format!("{OBJECT_PREFIX}{}", Uuid::new_v4())
}

/// Validate an object key: must be `images/<name>` with a single,
/// non-empty, path-safe name segment. Rejects anything that could
/// escape the store root.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    let Some(name) = key.strip_prefix(OBJECT_PREFIX) else {
        return false;
    };
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !name.starts_with('.')
}

// =============================================================================
// TRAIT
// =============================================================================

/// Async byte store. Implementations must be safe to share across handlers.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for malformed keys or `Io` on write failure.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Fetch the object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no object exists, `InvalidKey` for malformed
    /// keys, or `Io` on read failure.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove the object under `key`. Removing a missing object is not an
    /// error — deletes are idempotent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for malformed keys or `Io` on delete failure.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// FILESYSTEM STORE
// =============================================================================

/// Filesystem-backed store rooted at `DATA_DIR`. Keys map directly to
/// paths below the root; `is_valid_key` guarantees they cannot traverse
/// out of it.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait::async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(key.to_owned())),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// `HashMap`-backed store used by tests and local experiments.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        self.objects.lock().unwrap().insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_owned()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
