//! Processor stack for chaining processing steps

use std::sync::Arc;

use async_trait::async_trait;
use stowage_core::{File, Result};

use crate::traits::Processor;

/// Runs its processors in the order they were added, feeding each the file
/// returned by the previous one.
#[derive(Default, Clone)]
pub struct StackProcessor {
    processors: Vec<Arc<dyn Processor>>,
}

impl StackProcessor {
    pub fn new(processors: Vec<Arc<dyn Processor>>) -> Self {
        Self { processors }
    }

    pub fn add(&mut self, processor: Arc<dyn Processor>) {
        self.processors.push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[async_trait]
impl Processor for StackProcessor {
    async fn process(&self, file: File) -> Result<File> {
        let mut file = file;
        for processor in &self.processors {
            file = processor.process(file).await?;
        }
        Ok(file)
    }
}
