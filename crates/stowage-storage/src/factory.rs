use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use stowage_core::{AdapterConfig, Error, Result};

use crate::adapter::StorageAdapter;
use crate::local::LocalStorage;
use crate::memory::MemoryStorage;

/// Builds one kind of storage adapter from its options
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn build(&self, options: &Map<String, Value>) -> Result<Arc<dyn StorageAdapter>>;
}

/// `{"root": "/var/lib/stowage"}`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAdapterFactory;

#[async_trait]
impl AdapterFactory for LocalAdapterFactory {
    async fn build(&self, options: &Map<String, Value>) -> Result<Arc<dyn StorageAdapter>> {
        let root = options
            .get("root")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::InvalidConfiguration("local adapter requires a `root` option".to_string())
            })?;

        let storage = LocalStorage::new(root)
            .await
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        Ok(Arc::new(storage))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryAdapterFactory;

#[async_trait]
impl AdapterFactory for MemoryAdapterFactory {
    async fn build(&self, _options: &Map<String, Value>) -> Result<Arc<dyn StorageAdapter>> {
        Ok(Arc::new(MemoryStorage::new()))
    }
}

/// Maps implementation names to adapter factories
#[derive(Clone)]
pub struct StorageAdapterFactory {
    factories: HashMap<String, Arc<dyn AdapterFactory>>,
}

impl StorageAdapterFactory {
    /// A factory without any registered implementation
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, implementation: impl Into<String>, factory: Arc<dyn AdapterFactory>) {
        self.factories.insert(implementation.into(), factory);
    }

    pub fn implementations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create a storage adapter based on configuration
    pub async fn build_storage_adapter(
        &self,
        config: &AdapterConfig,
    ) -> Result<Arc<dyn StorageAdapter>> {
        let factory = self.factories.get(&config.implementation).ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "no adapter factory registered for `{}`",
                config.implementation
            ))
        })?;

        factory.build(&config.options).await
    }
}

impl Default for StorageAdapterFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register("local", Arc::new(LocalAdapterFactory));
        factory.register("memory", Arc::new(MemoryAdapterFactory));
        factory
    }
}
