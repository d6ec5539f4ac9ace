//! File entity
//!
//! [`File`] is an immutable value: every `with_*` method returns a modified copy and
//! leaves the receiver untouched. Clones never share the metadata or variant maps.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::path_builder::PathBuilder;
use crate::path_info;
use crate::resource::Resource;
use crate::url_builder::UrlBuilder;
use crate::variant::{Variant, Variants};

/// Ordered, key-unique metadata
pub type Metadata = IndexMap<String, Value>;

const SIZE_UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
const SIZE_PRECISION: [usize; 5] = [0, 0, 2, 2, 3];

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    uuid: Uuid,
    filename: String,
    extension: Option<String>,
    filesize: u64,
    mime_type: String,
    storage: String,
    collection: Option<String>,
    model: Option<String>,
    model_id: Option<String>,
    metadata: Metadata,
    path: Option<String>,
    url: Option<String>,
    variants: Variants,
    resource: Option<Resource>,
}

impl File {
    /// New file with a random v4 UUID
    pub fn create(
        filename: impl Into<String>,
        filesize: u64,
        mime_type: impl Into<String>,
        storage: impl Into<String>,
    ) -> Self {
        Self::new(Uuid::new_v4(), filename, filesize, mime_type, storage)
    }

    pub fn new(
        uuid: Uuid,
        filename: impl Into<String>,
        filesize: u64,
        mime_type: impl Into<String>,
        storage: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        Self {
            uuid,
            extension: path_info::extension(&filename).map(str::to_string),
            filename,
            filesize,
            mime_type: mime_type.into(),
            storage: storage.into(),
            collection: None,
            model: None,
            model_id: None,
            metadata: Metadata::new(),
            path: None,
            url: None,
            variants: Variants::new(),
            resource: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn filesize(&self) -> u64 {
        self.filesize
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Name of the storage adapter the file lives in
    pub fn storage(&self) -> &str {
        &self.storage
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Resolved storage path
    pub fn path(&self) -> Result<&str> {
        self.path.as_deref().ok_or(Error::PathNotSet)
    }

    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn variants(&self) -> &Variants {
        &self.variants
    }

    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.contains_key(name)
    }

    pub fn variant(&self, name: &str) -> Result<&Variant> {
        self.variants
            .get(name)
            .ok_or_else(|| Error::VariantNotFound(name.to_string()))
    }

    /// Paths of all variants that were already materialized
    pub fn variant_paths(&self) -> IndexMap<String, String> {
        self.variants
            .iter()
            .filter(|(_, v)| v.has_path())
            .map(|(name, v)| (name.clone(), v.path().to_string()))
            .collect()
    }

    /// Human readable size using binary multiples, e.g. `325kB`
    pub fn readable_size(&self) -> String {
        readable_size(self.filesize)
    }

    pub fn with_uuid(&self, uuid: Uuid) -> Self {
        let mut that = self.clone();
        that.uuid = uuid;
        that
    }

    /// Replace the display name; the extension is derived again.
    pub fn with_filename(&self, filename: impl Into<String>) -> Self {
        let mut that = self.clone();
        that.filename = filename.into();
        that.extension = path_info::extension(&that.filename).map(str::to_string);
        that
    }

    pub fn with_storage(&self, storage: impl Into<String>) -> Self {
        let mut that = self.clone();
        that.storage = storage.into();
        that
    }

    pub fn with_resource(&self, resource: Resource) -> Self {
        let mut that = self.clone();
        that.resource = Some(resource);
        that
    }

    /// Same as [`File::with_resource`] for a file on disk
    pub fn with_file(&self, path: impl Into<PathBuf>) -> Self {
        self.with_resource(Resource::Disk(path.into()))
    }

    pub fn without_resource(&self) -> Self {
        let mut that = self.clone();
        that.resource = None;
        that
    }

    pub fn belongs_to_model(&self, model: impl Into<String>, model_id: impl ToString) -> Self {
        let mut that = self.clone();
        that.model = Some(model.into());
        that.model_id = Some(model_id.to_string());
        that
    }

    pub fn add_to_collection(&self, collection: impl Into<String>) -> Self {
        let mut that = self.clone();
        that.collection = Some(collection.into());
        that
    }

    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let mut that = self.clone();
        that.path = Some(path.into());
        that
    }

    pub fn with_url(&self, url: impl Into<String>) -> Self {
        let mut that = self.clone();
        that.url = Some(url.into());
        that
    }

    /// Set metadata. With `overwrite` the given map replaces the existing one,
    /// otherwise keys are merged and the given values win.
    pub fn with_metadata(&self, metadata: Metadata, overwrite: bool) -> Self {
        let mut that = self.clone();
        if overwrite {
            that.metadata = metadata;
        } else {
            let mut merged = metadata;
            for (key, value) in &self.metadata {
                merged.entry(key.clone()).or_insert_with(|| value.clone());
            }
            that.metadata = merged;
        }
        that
    }

    pub fn with_metadata_key(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut that = self.clone();
        that.metadata.insert(key.into(), value.into());
        that
    }

    pub fn without_metadata_key(&self, key: &str) -> Self {
        let mut that = self.clone();
        that.metadata.shift_remove(key);
        that
    }

    pub fn without_metadata(&self) -> Self {
        let mut that = self.clone();
        that.metadata.clear();
        that
    }

    /// Add or replace a variant
    pub fn with_variant(&self, name: impl Into<String>, variant: Variant) -> Self {
        let mut that = self.clone();
        that.variants.insert(name.into(), variant);
        that
    }

    /// Set many variants at once. With `merge` they are added to the existing
    /// variants (same names are replaced), otherwise they replace them.
    pub fn with_variants(&self, variants: Variants, merge: bool) -> Self {
        let mut that = self.clone();
        if merge {
            that.variants.extend(variants);
        } else {
            that.variants = variants;
        }
        that
    }

    pub fn without_variant(&self, name: &str) -> Self {
        let mut that = self.clone();
        that.variants.shift_remove(name);
        that
    }

    /// Assign the storage path computed by `builder`.
    ///
    /// Fails with [`Error::PathAlreadySet`] when the file already has a path, so a
    /// file can't silently be moved to a second location.
    pub fn build_path(&self, builder: &dyn PathBuilder) -> Result<Self> {
        if let Some(path) = &self.path {
            return Err(Error::PathAlreadySet(path.clone()));
        }

        let path = builder.path(self)?;
        Ok(self.with_path(path))
    }

    /// Assign the public URL of the file and of every materialized variant
    pub fn build_url(&self, builder: &dyn UrlBuilder) -> Result<Self> {
        let mut that = self.with_url(builder.url(self)?);
        for (name, variant) in that.variants.iter_mut() {
            if variant.has_path() {
                *variant = variant.with_url(builder.url_for_variant(self, name));
            }
        }
        Ok(that)
    }

    /// JSON projection for logging and API responses
    pub fn to_json(&self) -> Value {
        json!({
            "uuid": self.uuid.to_string(),
            "filename": self.filename,
            "filesize": self.filesize,
            "mimeType": self.mime_type,
            "extension": self.extension,
            "storage": self.storage,
            "path": self.path,
            "model": self.model,
            "modelId": self.model_id,
            "collection": self.collection,
            "readableSize": self.readable_size(),
            "variants": self.variants,
            "metadata": self.metadata,
            "url": self.url.clone().unwrap_or_default(),
        })
    }
}

fn readable_size(size: u64) -> String {
    if size == 0 {
        return "0B".to_string();
    }

    let mut power = 0;
    let mut rest = size;
    while rest >= 1024 && power < SIZE_UNITS.len() - 1 {
        rest /= 1024;
        power += 1;
    }
    let value = size as f64 / 1024f64.powi(power as i32);

    let formatted = format!("{:.*}", SIZE_PRECISION[power], value);
    let formatted = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    };

    format!("{}{}", formatted, SIZE_UNITS[power])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::ImageVariant;

    fn titus() -> File {
        File::create("titus.jpg", 332643, "image/jpeg", "local")
            .with_uuid(Uuid::parse_str("914e1512-9153-4253-a81e-7ee2edc1d973").unwrap())
            .with_filename("foobar.jpg")
            .add_to_collection("avatar")
            .belongs_to_model("User", 1)
    }

    #[test]
    fn test_attributes() {
        let file = titus();

        assert_eq!(file.uuid().to_string(), "914e1512-9153-4253-a81e-7ee2edc1d973");
        assert_eq!(file.filename(), "foobar.jpg");
        assert_eq!(file.extension(), Some("jpg"));
        assert_eq!(file.mime_type(), "image/jpeg");
        assert_eq!(file.storage(), "local");
        assert_eq!(file.collection(), Some("avatar"));
        assert_eq!(file.model(), Some("User"));
        assert_eq!(file.model_id(), Some("1"));
        assert!(!file.has_variants());
        assert!(!file.has_variant("somemanipulation"));
    }

    #[test]
    fn test_path_not_set() {
        let file = titus();
        assert!(matches!(file.path(), Err(Error::PathNotSet)));

        let file = file.with_path("/test/path/file.jpg");
        assert_eq!(file.path().unwrap(), "/test/path/file.jpg");
    }

    #[test]
    fn test_metadata_is_copy_on_write() {
        let e1 = titus();
        let e2 = e1.with_metadata_key("k", "v");

        assert!(!e1.metadata().contains_key("k"));
        assert_eq!(e2.metadata()["k"], json!("v"));
    }

    #[test]
    fn test_metadata_merge_and_overwrite() {
        let file = titus()
            .with_metadata(
                Metadata::from([("one".into(), json!("two")), ("two".into(), json!("one"))]),
                false,
            )
            .with_metadata_key("bar", "foo");

        let keys: Vec<&String> = file.metadata().keys().collect();
        assert_eq!(keys, vec!["one", "two", "bar"]);

        let merged = file.with_metadata(Metadata::from([("one".into(), json!(1))]), false);
        assert_eq!(merged.metadata()["one"], json!(1));
        assert_eq!(merged.metadata().len(), 3);

        let replaced = file.with_metadata(Metadata::from([("only".into(), json!(true))]), true);
        assert_eq!(replaced.metadata().len(), 1);

        let removed = file.without_metadata_key("bar");
        assert!(!removed.metadata().contains_key("bar"));
        assert!(file.metadata().contains_key("bar"));

        assert!(file.without_metadata().metadata().is_empty());
    }

    #[test]
    fn test_variant_round_trip() {
        let descriptor = ImageVariant::new("x").flip_vertical().into_variant();
        let file = titus().with_variant("x", descriptor.clone());

        assert_eq!(file.variant("x").unwrap(), &descriptor);
        assert!(matches!(
            file.variant("missing"),
            Err(Error::VariantNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_variants_merge() {
        let a = ImageVariant::new("a").flip_vertical().into_variant();
        let b = ImageVariant::new("b").flip_horizontal().into_variant();
        let file = titus().with_variant("a", a.clone());

        let merged = file.with_variants(Variants::from([("b".to_string(), b.clone())]), true);
        assert_eq!(merged.variants().len(), 2);

        let replaced = file.with_variants(Variants::from([("b".to_string(), b)]), false);
        assert_eq!(replaced.variants().len(), 1);
        assert!(!replaced.has_variant("a"));

        assert!(!merged.without_variant("a").has_variant("a"));
        assert!(merged.has_variant("a"));
    }

    #[test]
    fn test_variant_paths_skip_unprocessed() {
        let done = Variant::default().with_path("a/b.123456.jpg");
        let file = titus()
            .with_variant("done", done)
            .with_variant("pending", Variant::default());

        let paths = file.variant_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths["done"], "a/b.123456.jpg");
    }

    #[test]
    fn test_with_filename_updates_extension() {
        let file = titus().with_filename("README");
        assert_eq!(file.extension(), None);

        let file = file.with_filename("archive.tar.gz");
        assert_eq!(file.extension(), Some("gz"));
    }

    #[test]
    fn test_readable_size() {
        assert_eq!(readable_size(0), "0B");
        assert_eq!(readable_size(512), "512B");
        assert_eq!(readable_size(332643), "325kB");
        assert_eq!(readable_size(1024 * 1024 * 3 / 2), "1.5MB");
        assert_eq!(readable_size(1024 * 1024 * 1024), "1GB");
        assert_eq!(titus().readable_size(), "325kB");
    }

    #[test]
    fn test_to_json_projection() {
        let file = titus()
            .with_metadata_key("one", "two")
            .with_path("/test/path/file.jpg");

        let value = file.to_json();
        assert_eq!(value["uuid"], json!("914e1512-9153-4253-a81e-7ee2edc1d973"));
        assert_eq!(value["filesize"], json!(332643));
        assert_eq!(value["extension"], json!("jpg"));
        assert_eq!(value["path"], json!("/test/path/file.jpg"));
        assert_eq!(value["modelId"], json!("1"));
        assert_eq!(value["readableSize"], json!("325kB"));
        assert_eq!(value["variants"], json!({}));
        assert_eq!(value["metadata"], json!({ "one": "two" }));
        assert_eq!(value["url"], json!(""));

        // Pure projection
        assert_eq!(file.to_json(), value);
    }

    #[test]
    fn test_to_json_keeps_metadata_order() {
        let file = titus()
            .with_metadata_key("zulu", 1)
            .with_metadata_key("alpha", 2)
            .with_metadata_key("mike", 3);

        let value = file.to_json();
        let keys: Vec<&String> = value["metadata"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zulu", "alpha", "mike"]);
    }
}
