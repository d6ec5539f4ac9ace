//! Storage adapter trait
//!
//! This module defines the byte-level capability every storage backend provides.
//! Adapters know nothing about files, variants or hooks: they put, stream, check
//! and delete bytes under a relative path.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use stowage_core::BoxedReader;
use thiserror::Error;

/// Storage adapter errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for adapter operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Chunked content of a stored object
pub type ByteStream = Pin<Box<dyn Stream<Item = BackendResult<Bytes>> + Send>>;

#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Write `data` to `path`, replacing existing content. Returns the bytes written.
    async fn write(&self, path: &str, data: Bytes) -> BackendResult<u64>;

    /// Write everything `reader` yields to `path`. Returns the bytes written.
    async fn write_stream(&self, path: &str, reader: BoxedReader) -> BackendResult<u64>;

    /// Stream the content stored at `path`
    async fn read_stream(&self, path: &str) -> BackendResult<ByteStream>;

    /// Read the whole content stored at `path`
    async fn read(&self, path: &str) -> BackendResult<Bytes> {
        let mut stream = self.read_stream(path).await?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Delete `path`. Deleting a missing path is left to the adapter's semantics.
    async fn delete(&self, path: &str) -> BackendResult<()>;

    async fn exists(&self, path: &str) -> BackendResult<bool>;

    /// Short name of the implementation, e.g. `local`
    fn adapter_type(&self) -> &'static str;
}
