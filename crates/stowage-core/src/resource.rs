use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tempfile::TempPath;
use tokio::io::AsyncRead;

use crate::error::{Error, Result};

/// Readable stream handed to adapters and processors
pub type BoxedReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Source content attached to a file while it is being stored.
///
/// Every call to [`Resource::open`] yields a reader positioned at the start of the
/// content, so the same resource can be written to a backend and staged for
/// variant processing afterwards.
#[derive(Clone)]
pub enum Resource {
    /// A file on local disk that stowage does not own
    Disk(PathBuf),
    /// Content held in memory
    Memory(Bytes),
    /// Upload spooled to a scratch file; removed when the last clone is dropped
    Spooled(Arc<TempPath>),
}

impl Resource {
    pub async fn open(&self) -> Result<BoxedReader> {
        match self {
            Resource::Disk(path) => Ok(Box::pin(open_file(path).await?)),
            Resource::Spooled(path) => Ok(Box::pin(open_file(path).await?)),
            Resource::Memory(bytes) => Ok(Box::pin(Cursor::new(bytes.clone()))),
        }
    }

    /// Location on local disk, when the content lives in a file
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Resource::Disk(path) => Some(path),
            Resource::Spooled(path) => Some(path),
            Resource::Memory(_) => None,
        }
    }
}

async fn open_file(path: &Path) -> Result<tokio::fs::File> {
    tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileDoesNotExist(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => Error::FileNotReadable(path.to_path_buf()),
        _ => Error::Io(e),
    })
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Disk(path) => f.debug_tuple("Disk").field(path).finish(),
            Resource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            Resource::Spooled(path) => f.debug_tuple("Spooled").field(&path.to_path_buf()).finish(),
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Resource::Disk(a), Resource::Disk(b)) => a == b,
            (Resource::Memory(a), Resource::Memory(b)) => a == b,
            (Resource::Spooled(a), Resource::Spooled(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
