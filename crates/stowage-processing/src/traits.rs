use async_trait::async_trait;
use stowage_core::{File, Result};

/// A processing step run on a file after it has been stored
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, file: File) -> Result<File>;
}
