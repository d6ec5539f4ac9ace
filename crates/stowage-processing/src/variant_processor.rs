//! Variant processor
//!
//! Materializes the declared variants of an image file. The original is staged
//! once into a scratch file; every variant is then loaded from that pristine copy,
//! transformed, encoded and written to the file's adapter at the path computed by
//! the path builder.
//!
//! Variants are committed one by one. When a variant fails, the ones written
//! before it stay in storage and the error is returned.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use image::{DynamicImage, ImageFormat};
use stowage_core::{Error, File, PathBuilder, ProcessorConfig, Result};
use stowage_storage::StorageService;
use tempfile::TempPath;
use tokio_util::io::StreamReader;

use crate::image::{ImageOperation, ImageTransformer};
use crate::optimizer::{CommandOptimizer, Optimizer};
use crate::staging::Scratch;
use crate::traits::Processor;

pub struct VariantProcessor {
    storage: Arc<StorageService>,
    path_builder: Arc<dyn PathBuilder>,
    optimizer: Arc<dyn Optimizer>,
    config: ProcessorConfig,
    scratch: Scratch,
}

impl VariantProcessor {
    pub fn new(
        storage: Arc<StorageService>,
        path_builder: Arc<dyn PathBuilder>,
        config: ProcessorConfig,
    ) -> Self {
        let scratch = Scratch::new(config.temp_dir.clone());
        Self {
            storage,
            path_builder,
            optimizer: Arc::new(CommandOptimizer::default()),
            config,
            scratch,
        }
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn Optimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Whether `file` has variants and a supported MIME type
    pub fn is_applicable(&self, file: &File) -> bool {
        file.has_variants()
            && self
                .config
                .mime_types
                .iter()
                .any(|m| m == file.mime_type())
    }

    /// Materialize the variants of `file`, restricted to `only` when it is not
    /// empty. Returns the file with the path of every written variant recorded.
    pub async fn process_variants(&self, file: File, only: &[String]) -> Result<File> {
        if !self.is_applicable(&file) {
            return Ok(file);
        }

        // Every selected variant is parsed before anything is staged or written
        let mut selected = Vec::new();
        for (name, variant) in file.variants() {
            if !variant.has_operations() || (!only.is_empty() && !only.contains(name)) {
                continue;
            }
            let operations = variant
                .operations()
                .iter()
                .map(ImageOperation::from_operation)
                .collect::<Result<Vec<_>>>()?;
            selected.push((name.clone(), variant.clone(), operations));
        }

        if selected.is_empty() {
            return Ok(file);
        }

        let format = ImageTransformer::output_format(file.extension(), file.mime_type())?;
        let original = self.stage_original(&file).await?;
        let suffix = suffix(&file);

        let mut file = file;

        for (name, variant, operations) in selected {
            let image = self.transform(&original, operations, &name).await?;
            let path = self.path_builder.path_for_variant(&file, &name)?;
            let quality = self.config.quality;

            if variant.optimize() {
                let encoded = self.scratch.create(&suffix)?;
                let optimized = self.scratch.create(&suffix)?;

                let data = encode(image, format, quality).await?;
                tokio::fs::write(&encoded, &data)
                    .await
                    .map_err(|e| Error::staging_failed(encoded.to_path_buf(), Some(e)))?;

                self.optimizer
                    .optimize(&encoded, &optimized, file.mime_type())
                    .await?;
                self.storage
                    .store_file(file.storage(), &path, &optimized)
                    .await?;
            } else {
                let data = encode(image, format, quality).await?;
                self.storage.store_bytes(file.storage(), &path, data).await?;
            }

            tracing::debug!(
                variant = %name,
                path = %path,
                optimized = variant.optimize(),
                "Variant stored"
            );

            file = file.with_variant(name, variant.with_path(path));
        }

        Ok(file)
    }

    /// Copy the original into a scratch file, from the attached resource when
    /// there is one, otherwise from storage
    async fn stage_original(&self, file: &File) -> Result<TempPath> {
        let suffix = suffix(file);

        match file.resource() {
            Some(resource) => {
                let mut reader = resource.open().await?;
                self.scratch.stage(&mut reader, &suffix).await
            }
            None => {
                let stream = self
                    .storage
                    .read_stream(file.storage(), file.path()?)
                    .await?;
                let mut reader =
                    StreamReader::new(stream.map(|chunk| chunk.map_err(std::io::Error::other)));
                self.scratch.stage(&mut reader, &suffix).await
            }
        }
    }

    /// Load a fresh copy of the original and apply `operations` to it
    async fn transform(
        &self,
        original: &TempPath,
        operations: Vec<ImageOperation>,
        variant: &str,
    ) -> Result<DynamicImage> {
        let source = original.to_path_buf();
        let variant = variant.to_string();

        tokio::task::spawn_blocking(move || -> Result<DynamicImage> {
            let mut img = ImageTransformer::load(&source)?;
            for operation in &operations {
                img = ImageTransformer::apply(img, operation)?;
                tracing::debug!(
                    variant = %variant,
                    operation = operation.name(),
                    width = img.width(),
                    height = img.height(),
                    "Applied image operation"
                );
            }
            Ok(img)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Image transform task failed: {}", e))?
    }
}

#[async_trait]
impl Processor for VariantProcessor {
    async fn process(&self, file: File) -> Result<File> {
        self.process_variants(file, &[]).await
    }
}

async fn encode(image: DynamicImage, format: ImageFormat, quality: u8) -> Result<Bytes> {
    tokio::task::spawn_blocking(move || ImageTransformer::encode(&image, format, quality))
        .await
        .map_err(|e| anyhow::anyhow!("Image encode task failed: {}", e))?
}

fn suffix(file: &File) -> String {
    file.extension()
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}
