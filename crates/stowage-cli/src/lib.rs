//! Stowage CLI support
//!
//! Wires the configured adapters, path builder, file storage and variant
//! processor together for the `stowage` binary.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use stowage_core::factory::mime_type_for;
use stowage_core::path_info::basename;
use stowage_core::{
    File, FileFactory, ImageVariantCollection, LocalUrlBuilder, PathBuilder, StowageConfig,
    TemplatePathBuilder, UrlBuilder, Variant,
};
use stowage_processing::VariantProcessor;
use stowage_storage::{FileStorage, StorageService};
use uuid::Uuid;

/// Attributes used by the path templates
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    pub uuid: Option<Uuid>,
    pub model: Option<String>,
    pub model_id: Option<String>,
    pub collection: Option<String>,
}

impl FileOptions {
    fn apply(&self, file: File) -> File {
        let mut file = file;
        if let Some(uuid) = self.uuid {
            file = file.with_uuid(uuid);
        }
        if let Some(model) = &self.model {
            file = file.belongs_to_model(model.clone(), self.model_id.clone().unwrap_or_default());
        }
        if let Some(collection) = &self.collection {
            file = file.add_to_collection(collection.clone());
        }
        file
    }
}

pub struct Stowage {
    files: FileStorage,
    processor: VariantProcessor,
    path_builder: Arc<dyn PathBuilder>,
    url_builder: Option<Arc<dyn UrlBuilder>>,
    factory: FileFactory,
}

impl Stowage {
    pub fn from_config(config: StowageConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let storage = Arc::new(
            StorageService::from_config(&config).context("Failed to configure storage adapters")?,
        );
        let path_builder: Arc<dyn PathBuilder> = Arc::new(
            TemplatePathBuilder::new(config.path_builder.clone())
                .context("Failed to create path builder")?,
        );

        let url_builder: Option<Arc<dyn UrlBuilder>> = config
            .url_base
            .as_ref()
            .map(|base| Arc::new(LocalUrlBuilder::new(base.clone())) as Arc<dyn UrlBuilder>);

        let mut files = FileStorage::new(storage.clone()).with_path_builder(path_builder.clone());
        if let Some(builder) = &url_builder {
            files = files.with_url_builder(builder.clone());
        }

        let mut factory = FileFactory::new();
        if let Some(dir) = &config.processing.temp_dir {
            factory = factory.with_temp_dir(dir.clone());
        }

        let processor = VariantProcessor::new(storage, path_builder.clone(), config.processing);

        Ok(Self {
            files,
            processor,
            path_builder,
            url_builder,
            factory,
        })
    }

    /// Storage path of a file named like `filename`, or of one of its variants
    pub fn path(
        &self,
        filename: &str,
        adapter: &str,
        options: &FileOptions,
        variant: Option<&str>,
    ) -> Result<String> {
        let name = basename(filename);
        let file = options.apply(File::create(name, 0, mime_type_for(name), adapter));

        let path = match variant {
            Some(variant) => self.path_builder.path_for_variant(&file, variant),
            None => self.path_builder.path(&file),
        };
        path.context("Failed to build path")
    }

    /// Store a local file and materialize its variants
    pub async fn store(
        &self,
        source: &Path,
        adapter: &str,
        options: &FileOptions,
        variants: Option<&str>,
        only: &[String],
    ) -> Result<File> {
        let file = self
            .factory
            .from_disk(source, adapter)
            .await
            .with_context(|| format!("Failed to read {}", source.display()))?;
        let mut file = options.apply(file);

        if let Some(json) = variants {
            let value = serde_json::from_str(json).context("Variants are not valid JSON")?;
            let collection =
                ImageVariantCollection::from_json(value).context("Invalid variant declaration")?;
            file = file.with_variants(collection.into_variants(), false);
        }

        let stored = self.files.store(file).await.context("Failed to store file")?;
        let processed = self
            .processor
            .process_variants(stored, only)
            .await
            .context("Failed to process variants")?;

        // Variant paths only exist once processing is done
        match &self.url_builder {
            Some(builder) => processed
                .build_url(builder.as_ref())
                .context("Failed to build URLs"),
            None => Ok(processed),
        }
    }

    /// Delete a stored object and its variants, variants first
    pub async fn remove(&self, adapter: &str, path: &str, variant_paths: &[String]) -> Result<File> {
        let name = basename(path);
        let mut file = File::create(name, 0, mime_type_for(name), adapter).with_path(path);
        for (i, variant_path) in variant_paths.iter().enumerate() {
            file = file.with_variant(
                format!("variant{}", i),
                Variant::default().with_path(variant_path.clone()),
            );
        }

        self.files
            .remove(file)
            .await
            .with_context(|| format!("Failed to remove {}", path))
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
