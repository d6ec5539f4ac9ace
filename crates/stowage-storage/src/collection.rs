use std::sync::Arc;

use indexmap::IndexMap;
use stowage_core::{Error, Result};

use crate::adapter::StorageAdapter;

/// Named adapter instances; a name can be taken only once.
#[derive(Default, Clone)]
pub struct AdapterCollection {
    adapters: IndexMap<String, Arc<dyn StorageAdapter>>,
}

impl AdapterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, adapter: Arc<dyn StorageAdapter>) -> Result<()> {
        let name = name.into();
        if self.has(&name) {
            return Err(Error::AdapterExists(name));
        }

        self.adapters.insert(name, adapter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StorageAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn StorageAdapter>> {
        self.adapters.shift_remove(name)
    }

    pub fn clear(&mut self) {
        self.adapters.clear();
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Adapter name to implementation type
    pub fn types(&self) -> IndexMap<String, &'static str> {
        self.adapters
            .iter()
            .map(|(name, adapter)| (name.clone(), adapter.adapter_type()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
