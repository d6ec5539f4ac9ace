//! In-memory storage adapter
//!
//! Keeps objects in a map and records every write and delete in order. Clones
//! share the same objects, so a test can keep a handle while the adapter is
//! owned by a [`StorageService`](crate::StorageService).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use stowage_core::BoxedReader;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

use crate::adapter::{BackendError, BackendResult, ByteStream, StorageAdapter};
use crate::keys::normalize_path;

/// A mutating call seen by [`MemoryStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Write(String),
    Delete(String),
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<IndexMap<String, Bytes>>>,
    operations: Arc<RwLock<Vec<StorageOp>>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter that rejects every write
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Writes and deletes in call order
    pub async fn operations(&self) -> Vec<StorageOp> {
        self.operations.read().await.clone()
    }

    pub async fn paths(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn get(&self, path: &str) -> Option<Bytes> {
        let key = normalize_path(path).ok()?;
        self.objects.read().await.get(&key).cloned()
    }

    async fn put(&self, path: &str, data: Bytes) -> BackendResult<u64> {
        let key = normalize_path(path)?;
        if self.fail_writes {
            return Err(BackendError::WriteFailed(format!("writes to `{}` are rejected", key)));
        }

        let size = data.len() as u64;
        self.objects.write().await.insert(key.clone(), data);
        self.operations.write().await.push(StorageOp::Write(key));
        Ok(size)
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn write(&self, path: &str, data: Bytes) -> BackendResult<u64> {
        self.put(path, data).await
    }

    async fn write_stream(&self, path: &str, mut reader: BoxedReader) -> BackendResult<u64> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| BackendError::WriteFailed(format!("Failed to read stream: {}", e)))?;
        self.put(path, Bytes::from(buf)).await
    }

    async fn read_stream(&self, path: &str) -> BackendResult<ByteStream> {
        let key = normalize_path(path)?;
        let data = self
            .objects
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or(BackendError::NotFound(key))?;

        Ok(Box::pin(futures::stream::once(async move { Ok::<_, BackendError>(data) })))
    }

    async fn delete(&self, path: &str) -> BackendResult<()> {
        let key = normalize_path(path)?;
        self.objects.write().await.shift_remove(&key);
        self.operations.write().await.push(StorageOp::Delete(key));
        Ok(())
    }

    async fn exists(&self, path: &str) -> BackendResult<bool> {
        let key = normalize_path(path)?;
        Ok(self.objects.read().await.contains_key(&key))
    }

    fn adapter_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_operations_in_order() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();

        storage.write("a/one.txt", Bytes::from_static(b"1")).await.unwrap();
        storage
            .write_stream("/a/two.txt", Box::pin(std::io::Cursor::new(b"22".to_vec())))
            .await
            .unwrap();
        storage.delete("a/one.txt").await.unwrap();

        assert_eq!(
            handle.operations().await,
            vec![
                StorageOp::Write("a/one.txt".to_string()),
                StorageOp::Write("a/two.txt".to_string()),
                StorageOp::Delete("a/one.txt".to_string()),
            ]
        );
        assert_eq!(handle.paths().await, vec!["a/two.txt".to_string()]);
        assert_eq!(&storage.read("a/two.txt").await.unwrap()[..], b"22");
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let storage = MemoryStorage::failing();
        let result = storage.write("a.txt", Bytes::from_static(b"x")).await;

        assert!(matches!(result, Err(BackendError::WriteFailed(_))));
        assert!(storage.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_missing() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.read("nope.txt").await,
            Err(BackendError::NotFound(_))
        ));
        assert!(!storage.exists("nope.txt").await.unwrap());
    }
}
