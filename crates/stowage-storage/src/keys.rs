//! Storage path normalization shared by the adapters.
//!
//! Paths coming from the path builder may use `\` as separator or start with a
//! separator when the leading template placeholder was empty. Adapters address
//! objects by the normalized form: `/`-separated, relative, without `.` or `..`
//! segments.

use crate::adapter::{BackendError, BackendResult};

pub fn normalize_path(path: &str) -> BackendResult<String> {
    let unified = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(BackendError::InvalidPath(format!(
                    "`{}` contains a parent directory segment",
                    path
                )))
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(BackendError::InvalidPath(format!("`{}` is empty", path)));
    }

    Ok(segments.join("/"))
}
