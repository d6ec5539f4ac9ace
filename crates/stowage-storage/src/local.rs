use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use stowage_core::BoxedReader;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::adapter::{BackendError, BackendResult, ByteStream, StorageAdapter};
use crate::keys::normalize_path;

/// Local filesystem storage adapter
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `root` - Root directory for stored objects (e.g., "/var/lib/stowage")
    pub async fn new(root: impl Into<PathBuf>) -> BackendResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            BackendError::Config(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalStorage { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a storage path to a filesystem path inside the root
    ///
    /// The normalized path has no `..` segments; symlinks that resolve outside the
    /// root are rejected as well.
    fn key_to_path(&self, path: &str) -> BackendResult<PathBuf> {
        let key = normalize_path(path)?;
        let full = self.root.join(&key);

        let root_canonical = self.root.canonicalize().map_err(|e| {
            BackendError::Config(format!("Failed to canonicalize root path: {}", e))
        })?;

        if let Ok(canonical) = full.canonicalize() {
            if canonical.strip_prefix(&root_canonical).is_err() {
                return Err(BackendError::InvalidPath(format!(
                    "`{}` resolves outside the storage directory",
                    path
                )));
            }
        }

        Ok(full)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> BackendResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for LocalStorage {
    async fn write(&self, path: &str, data: Bytes) -> BackendResult<u64> {
        let full = self.key_to_path(path)?;
        self.ensure_parent_dir(&full).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&full).await.map_err(|e| {
            BackendError::WriteFailed(format!("Failed to create file {}: {}", full.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            BackendError::WriteFailed(format!("Failed to write file {}: {}", full.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            BackendError::WriteFailed(format!("Failed to sync file {}: {}", full.display(), e))
        })?;

        tracing::debug!(
            path = %full.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(data.len() as u64)
    }

    async fn write_stream(&self, path: &str, mut reader: BoxedReader) -> BackendResult<u64> {
        let full = self.key_to_path(path)?;
        self.ensure_parent_dir(&full).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&full).await.map_err(|e| {
            BackendError::WriteFailed(format!("Failed to create file {}: {}", full.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            BackendError::WriteFailed(format!(
                "Failed to write stream to file {}: {}",
                full.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            BackendError::WriteFailed(format!("Failed to sync file {}: {}", full.display(), e))
        })?;

        tracing::debug!(
            path = %full.display(),
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream write successful"
        );

        Ok(bytes_copied)
    }

    async fn read_stream(&self, path: &str) -> BackendResult<ByteStream> {
        let full = self.key_to_path(path)?;

        if !fs::try_exists(&full).await.unwrap_or(false) {
            return Err(BackendError::NotFound(path.to_string()));
        }

        let file = fs::File::open(&full).await.map_err(|e| {
            BackendError::ReadFailed(format!("Failed to open file {}: {}", full.display(), e))
        })?;

        let stream = tokio_util::io::ReaderStream::new(file).map(|result| {
            result.map_err(|e| BackendError::ReadFailed(format!("Failed to read chunk: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, path: &str) -> BackendResult<()> {
        let full = self.key_to_path(path)?;

        if !fs::try_exists(&full).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&full).await.map_err(|e| {
            BackendError::DeleteFailed(format!("Failed to delete file {}: {}", full.display(), e))
        })?;

        Ok(())
    }

    async fn exists(&self, path: &str) -> BackendResult<bool> {
        let full = self.key_to_path(path)?;
        Ok(fs::try_exists(&full).await.unwrap_or(false))
    }

    fn adapter_type(&self) -> &'static str {
        "local"
    }
}
