//! Variant descriptors
//!
//! A variant is a named, derived representation of a file (a thumbnail, a flipped
//! copy, ...). It is declared before the file is stored as an ordered list of
//! operations and gets its `path` once a processor has materialized it.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Argument bag of a single operation
pub type Arguments = Map<String, Value>;

/// Variants of a file keyed by their unique name, in declaration order.
pub type Variants = IndexMap<String, Variant>;

/// A named operation with its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl Operation {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default)]
    operations: Vec<Operation>,
    #[serde(default)]
    path: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    optimize: bool,
}

impl Variant {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            operations,
            ..Default::default()
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn has_operations(&self) -> bool {
        !self.operations.is_empty()
    }

    /// Resolved storage path, empty until the variant was processed
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// Resolved public URL, empty until built
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn optimize(&self) -> bool {
        self.optimize
    }

    pub fn with_operation(&self, operation: Operation) -> Self {
        let mut that = self.clone();
        that.operations.push(operation);
        that
    }

    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let mut that = self.clone();
        that.path = path.into();
        that
    }

    pub fn with_url(&self, url: impl Into<String>) -> Self {
        let mut that = self.clone();
        that.url = url.into();
        that
    }

    pub fn with_optimize(&self, optimize: bool) -> Self {
        let mut that = self.clone();
        that.optimize = optimize;
        that
    }
}

/// Mirror axis of a flip operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipDirection {
    #[serde(rename = "h")]
    Horizontal,
    #[serde(rename = "v")]
    Vertical,
}

impl FromStr for FlipDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "h" => Ok(FlipDirection::Horizontal),
            "v" => Ok(FlipDirection::Vertical),
            _ => Err(Error::InvalidArgument(format!(
                "`{}` is invalid, provide `h` or `v`",
                s
            ))),
        }
    }
}

impl Display for FlipDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FlipDirection::Horizontal => write!(f, "h"),
            FlipDirection::Vertical => write!(f, "v"),
        }
    }
}

fn arguments(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        _ => Arguments::new(),
    }
}

/// Fluent builder for image variants
///
/// ```
/// use stowage_core::ImageVariant;
///
/// let thumb = ImageVariant::new("thumbnail")
///     .flip_horizontal()
///     .resize(300, 300, true, false)
///     .optimize();
/// assert_eq!(thumb.variant().operations().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImageVariant {
    name: String,
    variant: Variant,
}

impl ImageVariant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: Variant::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn into_variant(self) -> Variant {
        self.variant
    }

    fn push(mut self, name: &str, args: Value) -> Self {
        self.variant.operations.push(Operation::new(name, arguments(args)));
        self
    }

    /// Try to apply lossless optimizations if available on the system
    pub fn optimize(mut self) -> Self {
        self.variant.optimize = true;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.variant.path = path.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.variant.url = url.into();
        self
    }

    /// Cut out a `width` x `height` region. Without `x`/`y` the region is centered.
    pub fn crop(self, width: u32, height: u32, x: Option<u32>, y: Option<u32>) -> Self {
        self.push(
            "crop",
            json!({ "width": width, "height": height, "x": x, "y": y }),
        )
    }

    pub fn resize(self, width: u32, height: u32, aspect_ratio: bool, prevent_upscale: bool) -> Self {
        self.push(
            "resize",
            json!({
                "width": width,
                "height": height,
                "aspectRatio": aspect_ratio,
                "preventUpscale": prevent_upscale,
            }),
        )
    }

    /// Crop and scale to fill the box exactly. The height defaults to the width.
    pub fn fit(self, width: u32, height: Option<u32>, prevent_upscale: bool) -> Self {
        self.push(
            "fit",
            json!({ "width": width, "height": height, "preventUpscale": prevent_upscale }),
        )
    }

    pub fn flip(self, direction: FlipDirection) -> Self {
        self.push("flip", json!({ "direction": direction.to_string() }))
    }

    pub fn flip_horizontal(self) -> Self {
        self.push(
            "flipHorizontal",
            json!({ "direction": FlipDirection::Horizontal.to_string() }),
        )
    }

    pub fn flip_vertical(self) -> Self {
        self.push(
            "flipVertical",
            json!({ "direction": FlipDirection::Vertical.to_string() }),
        )
    }
}

/// Named set of image variants; names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageVariantCollection {
    variants: IndexMap<String, ImageVariant>,
}

impl ImageVariantCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a collection from its declarative form
    pub fn from_map(variants: Variants) -> Self {
        let variants = variants
            .into_iter()
            .map(|(name, variant)| {
                let image_variant = ImageVariant {
                    name: name.clone(),
                    variant,
                };
                (name, image_variant)
            })
            .collect();
        Self { variants }
    }

    /// Parse the JSON form `{"name": {"operations": [...], "optimize": bool}}`
    pub fn from_json(value: Value) -> Result<Self> {
        let variants: Variants = serde_json::from_value(value)?;
        Ok(Self::from_map(variants))
    }

    pub fn add(&mut self, variant: ImageVariant) -> Result<()> {
        if self.has(variant.name()) {
            return Err(Error::VariantExists(variant.name().to_string()));
        }

        self.variants.insert(variant.name().to_string(), variant);
        Ok(())
    }

    /// Declare a new variant and configure it through `build`
    pub fn add_new<F>(&mut self, name: &str, build: F) -> Result<()>
    where
        F: FnOnce(ImageVariant) -> ImageVariant,
    {
        let variant = build(ImageVariant::new(name));
        self.add(variant)
    }

    pub fn get(&self, name: &str) -> Option<&ImageVariant> {
        self.variants.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.variants.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ImageVariant> {
        self.variants.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageVariant> {
        self.variants.values()
    }

    /// The variant map as attached to a file
    pub fn to_variants(&self) -> Variants {
        self.variants
            .iter()
            .map(|(name, v)| (name.clone(), v.variant.clone()))
            .collect()
    }

    pub fn into_variants(self) -> Variants {
        self.variants
            .into_iter()
            .map(|(name, v)| (name, v.variant))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_operations_in_order() {
        let variant = ImageVariant::new("resizeAndFlip")
            .flip_horizontal()
            .resize(300, 300, true, false)
            .optimize()
            .into_variant();

        let names: Vec<&str> = variant.operations().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["flipHorizontal", "resize"]);
        assert!(variant.optimize());
        assert!(!variant.has_path());
        assert_eq!(variant.operations()[1].arguments["width"], json!(300));
        assert_eq!(variant.operations()[1].arguments["aspectRatio"], json!(true));
    }

    #[test]
    fn test_variant_is_copy_on_write() {
        let original = Variant::default();
        let processed = original.with_path("a/b.jpg");

        assert_eq!(original.path(), "");
        assert_eq!(processed.path(), "a/b.jpg");
    }

    #[test]
    fn test_flip_direction_parse() {
        assert_eq!("h".parse::<FlipDirection>().unwrap(), FlipDirection::Horizontal);
        assert_eq!("v".parse::<FlipDirection>().unwrap(), FlipDirection::Vertical);
        assert!(matches!(
            "left".parse::<FlipDirection>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_collection_rejects_duplicates() {
        let mut collection = ImageVariantCollection::new();
        collection
            .add_new("thumb", |v| v.resize(100, 100, true, true))
            .unwrap();

        let result = collection.add(ImageVariant::new("thumb"));
        assert!(matches!(result, Err(Error::VariantExists(name)) if name == "thumb"));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_collection_from_json() {
        let collection = ImageVariantCollection::from_json(json!({
            "thumb": {
                "operations": [
                    { "name": "fit", "arguments": { "width": 64 } }
                ],
                "optimize": true
            },
            "flipped": {
                "operations": [ { "name": "flipVertical" } ]
            }
        }))
        .unwrap();

        let variants = collection.to_variants();
        let names: Vec<&String> = variants.keys().collect();
        assert_eq!(names, vec!["thumb", "flipped"]);
        assert!(variants["thumb"].optimize());
        assert_eq!(variants["flipped"].operations()[0].name, "flipVertical");
        assert!(variants["flipped"].operations()[0].arguments.is_empty());
    }

    #[test]
    fn test_collection_remove() {
        let mut collection = ImageVariantCollection::new();
        collection.add(ImageVariant::new("a").flip_vertical()).unwrap();
        collection.add(ImageVariant::new("b").flip_horizontal()).unwrap();

        assert!(collection.remove("a").is_some());
        assert!(!collection.has("a"));
        assert_eq!(collection.iter().next().map(|v| v.name()), Some("b"));
    }
}
