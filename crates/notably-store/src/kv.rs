//! Durable key-value slots.
//!
//! The store keeps its whole collection under one key as a JSON text blob.
//! Backends only need to get and set whole values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StorageError;

// ============================================================================
// KeyValueStore Trait
// ============================================================================

/// Async string key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read the value under `key`. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

pub type SharedKvStore = Arc<dyn KeyValueStore>;

// ============================================================================
// FileKvStore
// ============================================================================

/// One file per key inside a data directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path backing `key`. Path separators in the key are flattened.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_io(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;

        tracing::trace!(key, path = %path.display(), bytes = value.len(), "Wrote key");
        Ok(())
    }
}

// ============================================================================
// MemoryKvStore
// ============================================================================

/// Failure mode injected into [`MemoryKvStore::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    StorageFull,
    Unavailable,
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: Mutex<Option<InjectedFailure>>,
    writes: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `key`.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.lock().insert(key.into(), value.into());
        self
    }

    /// Make subsequent writes fail (or succeed again with `None`).
    pub fn fail_writes(&self, failure: Option<InjectedFailure>) {
        *self.fail_writes.lock() = failure;
    }

    /// Current raw value under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match *self.fail_writes.lock() {
            Some(InjectedFailure::StorageFull) => {
                return Err(StorageError::StorageFull {
                    key: key.to_string(),
                });
            }
            Some(InjectedFailure::Unavailable) => {
                return Err(StorageError::Unavailable("injected failure".to_string()));
            }
            None => {}
        }
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = FileKvStore::new(dir.path());
        assert_eq!(store.get("notably-notes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_set_then_get() {
        let dir = TempDir::new().unwrap();
        let store = FileKvStore::new(dir.path().join("nested"));
        store.set("notably-notes", "[1]").await.unwrap();
        store.set("notably-notes", "[2]").await.unwrap();

        assert_eq!(
            store.get("notably-notes").await.unwrap().as_deref(),
            Some("[2]")
        );
        assert!(store.path_for("notably-notes").exists());
        assert!(
            !store
                .path_for("notably-notes")
                .with_extension("json.tmp")
                .exists()
        );
    }

    #[test]
    fn test_file_store_flattens_separators() {
        let store = FileKvStore::new("/data");
        assert_eq!(
            store.path_for("../a/b"),
            PathBuf::from("/data/.._a_b.json")
        );
    }

    #[tokio::test]
    async fn test_memory_store_injected_failure() {
        let store = MemoryKvStore::new().with_value("k", "old");
        store.fail_writes(Some(InjectedFailure::StorageFull));
        let err = store.set("k", "new").await.unwrap_err();
        assert!(err.is_storage_full());
        assert_eq!(store.raw("k").as_deref(), Some("old"));
        assert_eq!(store.write_count(), 0);

        store.fail_writes(None);
        store.set("k", "new").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(store.write_count(), 1);
    }
}
