//! Scratch files for variant processing
//!
//! Every scratch file is a [`TempPath`]: it is removed when dropped, on success
//! and on every error path alike.

use std::path::PathBuf;

use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWriteExt};

use stowage_core::{Error, Result};

const PREFIX: &str = "stowage-";

#[derive(Debug, Clone, Default)]
pub struct Scratch {
    dir: Option<PathBuf>,
}

impl Scratch {
    /// Scratch files in `dir`, or in the system temp directory
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Reserve an empty scratch file ending with `suffix`
    pub fn create(&self, suffix: &str) -> Result<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX).suffix(suffix);

        let file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| Error::staging_failed(self.dir(), Some(e)))?;

        Ok(file.into_temp_path())
    }

    /// Copy everything `reader` yields into a new scratch file.
    ///
    /// An empty source counts as a failed copy.
    pub async fn stage<R>(&self, reader: &mut R, suffix: &str) -> Result<TempPath>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.create(suffix)?;

        let mut out = tokio::fs::File::create(&path)
            .await
            .map_err(|e| Error::staging_failed(path.to_path_buf(), Some(e)))?;
        let copied = tokio::io::copy(reader, &mut out)
            .await
            .map_err(|e| Error::staging_failed(path.to_path_buf(), Some(e)))?;
        out.flush()
            .await
            .map_err(|e| Error::staging_failed(path.to_path_buf(), Some(e)))?;
        drop(out);

        if copied == 0 {
            return Err(Error::staging_failed(path.to_path_buf(), None));
        }

        tracing::debug!(path = %path.display(), size_bytes = copied, "Staged original");
        Ok(path)
    }
}
