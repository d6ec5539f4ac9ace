//! Configuration module
//!
//! Declarative configuration for adapters, path building and variant processing.
//! It can be read from a JSON document, from the environment, or both (the
//! environment wins).

use std::env;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::path_builder::PathBuilderConfig;

pub const DEFAULT_ADAPTER: &str = "local";
const DEFAULT_LOCAL_ROOT: &str = "./storage";
const DEFAULT_QUALITY: u8 = 90;

/// How to build one named adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Registered adapter factory, e.g. `local` or `memory`
    #[serde(alias = "class")]
    pub implementation: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl AdapterConfig {
    pub fn new(implementation: impl Into<String>, options: Map<String, Value>) -> Self {
        Self {
            implementation: implementation.into(),
            options,
        }
    }

    pub fn local(root: impl AsRef<Path>) -> Self {
        let mut options = Map::new();
        options.insert(
            "root".to_string(),
            json!(root.as_ref().to_string_lossy()),
        );
        Self::new("local", options)
    }
}

/// Variant processing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Scratch directory for staging, system temp dir when unset
    pub temp_dir: Option<PathBuf>,
    /// MIME types the image processor accepts
    pub mime_types: Vec<String>,
    /// Encoder quality for lossy formats, 1-100
    pub quality: u8,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            mime_types: vec![
                "image/gif".to_string(),
                "image/jpg".to_string(),
                "image/jpeg".to_string(),
                "image/png".to_string(),
            ],
            quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowageConfig {
    pub adapters: IndexMap<String, AdapterConfig>,
    pub path_builder: PathBuilderConfig,
    pub url_base: Option<String>,
    pub processing: ProcessorConfig,
}

impl Default for StowageConfig {
    fn default() -> Self {
        let mut adapters = IndexMap::new();
        adapters.insert(
            DEFAULT_ADAPTER.to_string(),
            AdapterConfig::local(DEFAULT_LOCAL_ROOT),
        );

        Self {
            adapters,
            path_builder: PathBuilderConfig::default(),
            url_base: None,
            processing: ProcessorConfig::default(),
        }
    }
}

impl StowageConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfiguration(format!("cannot read `{}`: {}", path.display(), e))
        })?;
        let config: StowageConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env`, then `STOWAGE_CONFIG`, then the `STOWAGE_*` overrides.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("STOWAGE_CONFIG") {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };

        if let Some(root) = lookup("STOWAGE_LOCAL_ROOT") {
            config
                .adapters
                .insert(DEFAULT_ADAPTER.to_string(), AdapterConfig::local(root));
        }

        if let Some(url_base) = lookup("STOWAGE_URL_BASE") {
            config.url_base = Some(url_base);
        }

        if let Some(temp_dir) = lookup("STOWAGE_TEMP_DIR") {
            config.processing.temp_dir = Some(PathBuf::from(temp_dir));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, adapter) in &self.adapters {
            if adapter.implementation.trim().is_empty() {
                return Err(Error::InvalidConfiguration(format!(
                    "adapter `{}` has no implementation",
                    name
                )));
            }
        }

        if !(1..=100).contains(&self.processing.quality) {
            return Err(Error::InvalidConfiguration(format!(
                "quality must be between 1 and 100, got {}",
                self.processing.quality
            )));
        }

        self.path_builder.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StowageConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.adapters.len(), 1);
        assert_eq!(config.adapters["local"].implementation, "local");
        assert_eq!(config.adapters["local"].options["root"], json!("./storage"));
        assert_eq!(config.processing.quality, 90);
        assert!(config.processing.mime_types.contains(&"image/jpeg".to_string()));
        assert_eq!(config.path_builder.random_path_levels, 3);
    }

    #[test]
    fn test_env_overrides() {
        let config = StowageConfig::from_lookup(lookup(&[
            ("STOWAGE_LOCAL_ROOT", "/srv/files"),
            ("STOWAGE_URL_BASE", "https://cdn.example.com"),
            ("STOWAGE_TEMP_DIR", "/var/tmp/stowage"),
        ]))
        .unwrap();

        assert_eq!(config.adapters["local"].options["root"], json!("/srv/files"));
        assert_eq!(config.url_base.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(
            config.processing.temp_dir,
            Some(PathBuf::from("/var/tmp/stowage"))
        );
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stowage.json");
        std::fs::write(
            &path,
            r#"{
                "adapters": {
                    "scratch": { "class": "memory" },
                    "local": { "implementation": "local", "options": { "root": "/data" } }
                },
                "path_builder": { "random_path_levels": 2, "beautify_filename": true },
                "processing": { "quality": 75 }
            }"#,
        )
        .unwrap();

        let config = StowageConfig::from_lookup(lookup(&[(
            "STOWAGE_CONFIG",
            path.to_str().unwrap(),
        )]))
        .unwrap();

        let names: Vec<&String> = config.adapters.keys().collect();
        assert_eq!(names, vec!["scratch", "local"]);
        assert_eq!(config.adapters["scratch"].implementation, "memory");
        assert!(config.adapters["scratch"].options.is_empty());
        assert_eq!(config.path_builder.random_path_levels, 2);
        assert!(config.path_builder.beautify_filename);
        assert_eq!(config.path_builder.directory_separator, "/");
        assert_eq!(config.processing.quality, 75);
        assert_eq!(config.processing.mime_types.len(), 4);
    }

    #[test]
    fn test_validation() {
        let mut config = StowageConfig::default();
        config.path_builder.random_path = "crc32".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration(_))
        ));

        let mut config = StowageConfig::default();
        config
            .adapters
            .insert("broken".to_string(), AdapterConfig::new(" ", Map::new()));
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration(msg)) if msg.contains("broken")
        ));

        let mut config = StowageConfig::default();
        config.processing.quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let result = StowageConfig::from_lookup(lookup(&[(
            "STOWAGE_CONFIG",
            "/does/not/exist.json",
        )]));
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}
