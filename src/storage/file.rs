//! File-backed document store: one JSON file per key under a root directory.

use super::{encode_for_store, SpaceStorage};
use crate::document::DocumentContainer;
use crate::error::StorageError;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Stores each space as `<root>/<key>.json`.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // keep keys from escaping the root directory
        let safe: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.root.join(format!("{}.json", safe))
    }
}

fn join_err(e: tokio::task::JoinError) -> StorageError {
    StorageError::Io(io::Error::new(io::ErrorKind::Other, e))
}

#[async_trait]
impl SpaceStorage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<DocumentContainer>, StorageError> {
        let path = self.path_for(key);
        let payload = tokio::task::spawn_blocking(move || match std::fs::read_to_string(&path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        })
        .await
        .map_err(join_err)?
        .map_err(StorageError::Io)?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
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
        let path = self.path_for(key);
        debug!(key, bytes = payload.len(), "saving document");
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, payload)
        })
        .await
        .map_err(join_err)?
        .map_err(StorageError::Io)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        tokio::task::spawn_blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        })
        .await
        .map_err(join_err)?
        .map_err(StorageError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        let doc = DocumentContainer::new();

        storage.save("space", &doc, None).await.unwrap();
        assert!(dir.path().join("space.json").exists());
        assert_eq!(storage.load("space").await.unwrap().unwrap(), doc);

        storage.remove("space").await.unwrap();
        assert!(storage.load("space").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_loads_none() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        storage
            .save("../evil", &DocumentContainer::new(), None)
            .await
            .unwrap();
        assert!(dir.path().join(".._evil.json").exists());
    }
}
