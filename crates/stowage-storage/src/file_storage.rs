//! File storage orchestration
//!
//! [`FileStorage`] drives the lifecycle of a [`File`]: assigning its path and URL,
//! running hooks, and writing or deleting the bytes through the
//! [`StorageService`].

use std::collections::HashMap;
use std::sync::Arc;

use stowage_core::{Error, File, Hook, HookStage, PathBuilder, Result, UrlBuilder};

use crate::service::StorageService;

pub struct FileStorage {
    storage: Arc<StorageService>,
    path_builder: Option<Arc<dyn PathBuilder>>,
    url_builder: Option<Arc<dyn UrlBuilder>>,
    hooks: HashMap<HookStage, Vec<Arc<dyn Hook>>>,
}

impl FileStorage {
    pub fn new(storage: Arc<StorageService>) -> Self {
        Self {
            storage,
            path_builder: None,
            url_builder: None,
            hooks: HashMap::new(),
        }
    }

    pub fn with_path_builder(mut self, builder: Arc<dyn PathBuilder>) -> Self {
        self.path_builder = Some(builder);
        self
    }

    pub fn with_url_builder(mut self, builder: Arc<dyn UrlBuilder>) -> Self {
        self.url_builder = Some(builder);
        self
    }

    pub fn storage(&self) -> &Arc<StorageService> {
        &self.storage
    }

    /// Register a hook by stage name (`beforeSave`, `afterSave`, `beforeRemove`,
    /// `afterRemove`). Hooks of a stage run in registration order.
    pub fn add_callback<H>(&mut self, name: &str, hook: H) -> Result<()>
    where
        H: Hook + 'static,
    {
        let stage: HookStage = name.parse()?;
        self.add_hook(stage, hook);
        Ok(())
    }

    pub fn add_hook<H>(&mut self, stage: HookStage, hook: H)
    where
        H: Hook + 'static,
    {
        self.hooks.entry(stage).or_default().push(Arc::new(hook));
    }

    /// Pass `file` through every hook registered for `stage`
    pub async fn run_callbacks(&self, stage: HookStage, file: File) -> Result<File> {
        let mut file = file;
        if let Some(hooks) = self.hooks.get(&stage) {
            for hook in hooks {
                file = hook.call(file).await?;
            }
        }
        Ok(file)
    }

    /// Write the file's resource to its adapter.
    ///
    /// A path is built only when the file has none yet. The resource stays
    /// attached so it can be read again for variant processing.
    pub async fn store(&self, file: File) -> Result<File> {
        let mut file = file;

        if let Some(builder) = &self.path_builder {
            if !file.has_path() {
                file = file.build_path(builder.as_ref())?;
            }
        }

        if let Some(builder) = &self.url_builder {
            file = file.build_url(builder.as_ref())?;
        }

        let file = self.run_callbacks(HookStage::BeforeSave, file).await?;

        let resource = file.resource().ok_or(Error::InvalidStreamResource)?;
        let path = file.path()?;
        let reader = resource.open().await?;
        self.storage
            .store_resource(file.storage(), path, reader)
            .await?;

        self.run_callbacks(HookStage::AfterSave, file).await
    }

    /// Delete every materialized variant, then the file itself
    pub async fn remove(&self, file: File) -> Result<File> {
        let file = self.run_callbacks(HookStage::BeforeRemove, file).await?;
        let path = file.path()?.to_string();

        for variant_path in file.variant_paths().values() {
            self.storage.remove_file(file.storage(), variant_path).await?;
        }
        self.storage.remove_file(file.storage(), &path).await?;

        self.run_callbacks(HookStage::AfterRemove, file).await
    }

    pub async fn remove_variant(&self, file: File, name: &str) -> Result<File> {
        let variant = file.variant(name)?;
        if !variant.has_path() {
            return Err(Error::VariantMissingPath(name.to_string()));
        }

        self.storage
            .remove_file(file.storage(), variant.path())
            .await?;

        Ok(file.without_variant(name))
    }
}
