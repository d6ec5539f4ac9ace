//! Error types module
//!
//! Every public operation in stowage either returns a fully formed value or one of the
//! named errors below. Input errors (bad templates, bad operation arguments) are raised
//! before any I/O happens; state errors flag a wrong calling sequence; I/O errors carry
//! the adapter name and path involved. Nothing is retried here.

use std::io;
use std::path::PathBuf;

/// Result type used across the stowage crates
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Path has not been set")]
    PathNotSet,

    #[error("Path is already set to `{0}`")]
    PathAlreadySet(String),

    #[error("Variant `{0}` does not exist")]
    VariantNotFound(String),

    #[error("Variant `{0}` already exists")]
    VariantExists(String),

    #[error("Variant `{0}` has no path, nothing to remove")]
    VariantMissingPath(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No adapter configured under the name `{0}`")]
    AdapterNotConfigured(String),

    #[error("An adapter with the name `{0}` already exists in the collection")]
    AdapterExists(String),

    #[error("Failed to write `{path}` to adapter `{adapter}`: {reason}")]
    StorageWrite {
        adapter: String,
        path: String,
        reason: String,
    },

    #[error("Failed to read `{path}` from adapter `{adapter}`: {reason}")]
    StorageRead {
        adapter: String,
        path: String,
        reason: String,
    },

    #[error("Failed to delete `{path}` from adapter `{adapter}`: {reason}")]
    StorageDelete {
        adapter: String,
        path: String,
        reason: String,
    },

    #[error("Callback type `{0}` is invalid")]
    InvalidCallbackName(String),

    #[error("Failed to stage content into temporary file `{}`", path.display())]
    TempStagingFailed {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    #[error("Operation `{0}` is not supported")]
    UnsupportedOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("The file has no readable stream resource attached")]
    InvalidStreamResource,

    #[error("File `{}` does not exist", .0.display())]
    FileDoesNotExist(PathBuf),

    #[error("File `{}` is not readable", .0.display())]
    FileNotReadable(PathBuf),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Optimizer error: {0}")]
    Optimizer(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Errors caused by the caller's input or calling sequence rather than by I/O.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::PathNotSet
                | Error::PathAlreadySet(_)
                | Error::VariantNotFound(_)
                | Error::VariantExists(_)
                | Error::VariantMissingPath(_)
                | Error::InvalidConfiguration(_)
                | Error::AdapterNotConfigured(_)
                | Error::InvalidCallbackName(_)
                | Error::UnsupportedOperation(_)
                | Error::InvalidArgument(_)
                | Error::InvalidStreamResource
        )
    }

    pub fn staging_failed(path: impl Into<PathBuf>, source: Option<io::Error>) -> Self {
        Error::TempStagingFailed {
            path: path.into(),
            source,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfiguration(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Error::InvalidArgument(format!("UUID parsing error: {}", err))
    }
}
