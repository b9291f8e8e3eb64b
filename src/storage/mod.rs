//! Storage contracts for persisted documents.
//!
//! The core does not own a storage backend; an external key/value store is
//! assumed. `MemoryStorage` backs tests and embedding shells, `FileStorage`
//! backs the CLI.

pub mod file;

use crate::document::DocumentContainer;
use crate::error::StorageError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

pub use file::FileStorage;

/// Byte ceiling applied to documents saved into the synced partition
/// (the per-item quota of browser sync storage).
pub const SYNC_SIZE_LIMIT: usize = 8_192;

/// External document store, keyed by space name.
#[async_trait]
pub trait SpaceStorage: Send + Sync {
    /// Load a stored container; `None` when the key is absent.
    async fn load(&self, key: &str) -> Result<Option<DocumentContainer>, StorageError>;

    /// Persist a container. When `size_limit` is given, implementations must
    /// refuse oversized payloads without touching stored state.
    async fn save(
        &self,
        key: &str,
        container: &DocumentContainer,
        size_limit: Option<usize>,
    ) -> Result<(), StorageError>;

    /// Remove a stored container, if present.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Serialize a container for storage, enforcing the size ceiling before
/// anything is written.
pub(crate) fn encode_for_store(
    container: &DocumentContainer,
    size_limit: Option<usize>,
) -> Result<String, StorageError> {
    let payload = serde_json::to_string(container)?;
    if let Some(limit) = size_limit {
        let size = payload.len();
        if size > limit {
            return Err(StorageError::SizeLimitExceeded { size, limit });
        }
    }
    Ok(payload)
}

/// In-memory storage for tests and embedding shells.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpaceStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<DocumentContainer>, StorageError> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(payload) => Ok(Some(serde_json::from_str(payload)?)),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        key: &str,
        container: &DocumentContainer,
        size_limit: Option<usize>,
    ) -> Result<(), StorageError> {
        let payload = encode_for_store(container, size_limit)?;
        self.entries.write().insert(key.to_string(), payload);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
