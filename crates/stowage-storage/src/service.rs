//! Storage service
//!
//! Registry of named storage adapters. Adapters are built lazily from their
//! configuration on first use and cached; the service is the only owner of the
//! instances and hands out a reference per call.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use indexmap::IndexMap;
use stowage_core::{AdapterConfig, BoxedReader, Error, Result, StowageConfig};
use tokio::sync::Mutex;

use crate::adapter::{BackendError, ByteStream, StorageAdapter};
use crate::collection::AdapterCollection;
use crate::factory::StorageAdapterFactory;

pub struct StorageService {
    factory: StorageAdapterFactory,
    configs: IndexMap<String, AdapterConfig>,
    // Also serializes lazy instantiation so an adapter is built only once
    adapters: Mutex<AdapterCollection>,
}

impl StorageService {
    pub fn new(factory: StorageAdapterFactory) -> Self {
        Self {
            factory,
            configs: IndexMap::new(),
            adapters: Mutex::new(AdapterCollection::new()),
        }
    }

    /// Service with the default factories and the adapters of `config`
    pub fn from_config(config: &StowageConfig) -> Result<Self> {
        let mut service = Self::new(StorageAdapterFactory::default());
        service.set_adapter_config_from_map(config.adapters.clone())?;
        Ok(service)
    }

    pub fn adapter_factory(&self) -> &StorageAdapterFactory {
        &self.factory
    }

    pub fn add_adapter_config(&mut self, name: impl Into<String>, config: AdapterConfig) {
        self.configs.insert(name.into(), config);
    }

    pub fn set_adapter_config_from_map(
        &mut self,
        configs: IndexMap<String, AdapterConfig>,
    ) -> Result<()> {
        for (name, config) in configs {
            if config.implementation.trim().is_empty() {
                return Err(Error::InvalidConfiguration(format!(
                    "adapter `{}` has no implementation",
                    name
                )));
            }
            self.configs.insert(name, config);
        }
        Ok(())
    }

    /// Register an already built adapter
    pub async fn add_adapter(
        &self,
        name: impl Into<String>,
        adapter: Arc<dyn StorageAdapter>,
    ) -> Result<()> {
        self.adapters.lock().await.add(name, adapter)
    }

    /// Names of the adapters instantiated so far
    pub async fn adapter_names(&self) -> Vec<String> {
        self.adapters.lock().await.names()
    }

    /// The adapter registered under `name`, built from its configuration on first use
    pub async fn adapter(&self, name: &str) -> Result<Arc<dyn StorageAdapter>> {
        let mut adapters = self.adapters.lock().await;
        if let Some(adapter) = adapters.get(name) {
            return Ok(adapter);
        }

        let config = self
            .configs
            .get(name)
            .ok_or_else(|| Error::AdapterNotConfigured(name.to_string()))?;

        let adapter = self.factory.build_storage_adapter(config).await?;
        adapters.add(name, adapter.clone())?;

        tracing::debug!(
            adapter = %name,
            implementation = %config.implementation,
            "Storage adapter instantiated"
        );

        Ok(adapter)
    }

    pub async fn store_resource(&self, adapter: &str, path: &str, reader: BoxedReader) -> Result<u64> {
        let backend = self.adapter(adapter).await?;
        let start = Instant::now();

        let size = backend
            .write_stream(path, reader)
            .await
            .map_err(|e| write_error(adapter, path, e))?;

        tracing::info!(
            adapter = %adapter,
            path = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stored resource"
        );

        Ok(size)
    }

    /// Copy a local file to `path` of the adapter
    pub async fn store_file(&self, adapter: &str, path: &str, file: &Path) -> Result<u64> {
        let source = tokio::fs::File::open(file).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileDoesNotExist(file.to_path_buf()),
            _ => Error::FileNotReadable(file.to_path_buf()),
        })?;

        self.store_resource(adapter, path, Box::pin(source)).await
    }

    pub async fn store_bytes(&self, adapter: &str, path: &str, data: Bytes) -> Result<u64> {
        let backend = self.adapter(adapter).await?;
        let start = Instant::now();

        let size = backend
            .write(path, data)
            .await
            .map_err(|e| write_error(adapter, path, e))?;

        tracing::info!(
            adapter = %adapter,
            path = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stored bytes"
        );

        Ok(size)
    }

    pub async fn read_stream(&self, adapter: &str, path: &str) -> Result<ByteStream> {
        self.adapter(adapter)
            .await?
            .read_stream(path)
            .await
            .map_err(|e| read_error(adapter, path, e))
    }

    pub async fn read(&self, adapter: &str, path: &str) -> Result<Bytes> {
        self.adapter(adapter)
            .await?
            .read(path)
            .await
            .map_err(|e| read_error(adapter, path, e))
    }

    pub async fn file_exists(&self, adapter: &str, path: &str) -> Result<bool> {
        self.adapter(adapter)
            .await?
            .exists(path)
            .await
            .map_err(|e| read_error(adapter, path, e))
    }

    pub async fn remove_file(&self, adapter: &str, path: &str) -> Result<()> {
        let backend = self.adapter(adapter).await?;
        let start = Instant::now();

        backend.delete(path).await.map_err(|e| Error::StorageDelete {
            adapter: adapter.to_string(),
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            adapter = %adapter,
            path = %path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Removed file"
        );

        Ok(())
    }
}

fn write_error(adapter: &str, path: &str, err: BackendError) -> Error {
    Error::StorageWrite {
        adapter: adapter.to_string(),
        path: path.to_string(),
        reason: err.to_string(),
    }
}

fn read_error(adapter: &str, path: &str, err: BackendError) -> Error {
    Error::StorageRead {
        adapter: adapter.to_string(),
        path: path.to_string(),
        reason: err.to_string(),
    }
}
