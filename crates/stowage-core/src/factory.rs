//! File factory
//!
//! Builds [`File`] entities from a path on disk, an upload stream or bytes in
//! memory. Every file gets a fresh v4 UUID and the content attached as its
//! [`Resource`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::file::File;
use crate::path_info;
use crate::resource::Resource;

const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type derived from the extension of `filename`
pub fn mime_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

#[derive(Debug, Clone, Default)]
pub struct FileFactory {
    temp_dir: Option<PathBuf>,
}

impl FileFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spool uploads into `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub async fn from_disk(&self, path: impl AsRef<Path>, storage: &str) -> Result<File> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Self::access_error(path, e))?;
        if !metadata.is_file() {
            return Err(Error::FileNotReadable(path.to_path_buf()));
        }

        // Probe read access up front rather than at store time
        tokio::fs::File::open(path)
            .await
            .map_err(|e| Self::access_error(path, e))?;

        let name = path.to_string_lossy();
        let filename = path_info::basename(&name);
        let file = File::create(filename, metadata.len(), mime_type_for(filename), storage);

        Ok(file.with_file(path))
    }

    /// Spool an upload to a scratch file owned by the returned entity.
    ///
    /// The scratch file lives as long as any clone of the entity's resource, so
    /// the content can be read again for variant processing after storing.
    pub async fn from_uploaded_stream<R>(
        &self,
        mut reader: R,
        filename: &str,
        size: u64,
        mime_type: &str,
        storage: &str,
    ) -> Result<File>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut builder = tempfile::Builder::new();
        builder.prefix("stowage-upload-");
        let spool = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| {
            Error::staging_failed(self.temp_dir.clone().unwrap_or_else(std::env::temp_dir), Some(e))
        })?;
        let spool = spool.into_temp_path();

        let mut out = tokio::fs::File::create(&spool)
            .await
            .map_err(|e| Error::staging_failed(spool.to_path_buf(), Some(e)))?;
        let copied = tokio::io::copy(&mut reader, &mut out)
            .await
            .map_err(|e| Error::staging_failed(spool.to_path_buf(), Some(e)))?;
        out.flush()
            .await
            .map_err(|e| Error::staging_failed(spool.to_path_buf(), Some(e)))?;

        tracing::debug!(
            path = %spool.display(),
            filename = %filename,
            size_bytes = copied,
            "Spooled upload"
        );

        let mime_type = if mime_type.is_empty() {
            mime_type_for(filename)
        } else {
            mime_type.to_string()
        };
        let file = File::create(path_info::basename(filename), size, mime_type, storage);

        Ok(file.with_resource(Resource::Spooled(Arc::new(spool))))
    }

    /// Build a file around content already held in memory
    pub fn from_bytes(
        &self,
        content: impl Into<Bytes>,
        filename: &str,
        mime_type: Option<&str>,
        storage: &str,
    ) -> File {
        let content = content.into();
        let mime_type = mime_type
            .map(str::to_string)
            .unwrap_or_else(|| mime_type_for(filename));

        File::create(
            path_info::basename(filename),
            content.len() as u64,
            mime_type,
            storage,
        )
        .with_resource(Resource::Memory(content))
    }

    fn access_error(path: &Path, err: std::io::Error) -> Error {
        match err.kind() {
            ErrorKind::NotFound => Error::FileDoesNotExist(path.to_path_buf()),
            ErrorKind::PermissionDenied => Error::FileNotReadable(path.to_path_buf()),
            _ => Error::Io(err),
        }
    }
}
