use std::io;

use thiserror::Error;

/// Failure reported by a [`KeyValueStore`](crate::KeyValueStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage full while writing '{key}'")]
    StorageFull { key: String },

    #[error("IO error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Classify an IO error, separating out the out-of-space family.
    pub fn from_io(key: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => Self::StorageFull {
                key: key.to_string(),
            },
            _ => Self::Io {
                key: key.to_string(),
                source,
            },
        }
    }

    /// True when the backend ran out of space or quota.
    pub fn is_storage_full(&self) -> bool {
        matches!(self, Self::StorageFull { .. })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Note already exists: {0}")]
    DuplicateId(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
