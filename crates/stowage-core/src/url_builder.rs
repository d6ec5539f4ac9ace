//! Public URL generation

use crate::error::Result;
use crate::file::File;

pub trait UrlBuilder: Send + Sync {
    /// URL of the original file. Fails when the file has no path yet.
    fn url(&self, file: &File) -> Result<String>;

    /// URL of a variant, or an empty string when the variant is unknown or has
    /// not been materialized.
    fn url_for_variant(&self, file: &File, variant: &str) -> String;
}

/// Prefixes storage paths with a base path or host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUrlBuilder {
    base_url: String,
}

impl LocalUrlBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn join(&self, path: &str) -> String {
        let path = path.replace('\\', "/");
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for LocalUrlBuilder {
    fn default() -> Self {
        Self::new("/")
    }
}

impl UrlBuilder for LocalUrlBuilder {
    fn url(&self, file: &File) -> Result<String> {
        Ok(self.join(file.path()?))
    }

    fn url_for_variant(&self, file: &File, variant: &str) -> String {
        match file.variants().get(variant) {
            Some(v) if v.has_path() => self.join(v.path()),
            _ => String::new(),
        }
    }
}
