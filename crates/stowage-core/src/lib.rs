//! Stowage Core Library
//!
//! File entity, variant descriptors, path and URL builders, hooks, errors and
//! configuration shared by the storage, processing and CLI crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod factory;
pub mod file;
pub mod hooks;
pub mod path_builder;
pub mod path_info;
pub mod resource;
pub mod sanitizer;
pub mod url_builder;
pub mod variant;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AdapterConfig, ProcessorConfig, StowageConfig};
pub use error::{Error, Result};
pub use factory::FileFactory;
pub use file::{File, Metadata};
pub use hooks::{Hook, HookStage};
pub use path_builder::{
    ConditionalPathBuilder, PathBuilder, PathBuilderConfig, PathOverrides, TemplatePathBuilder,
};
pub use resource::{BoxedReader, Resource};
pub use sanitizer::{DefaultFilenameSanitizer, FilenameSanitizer, SanitizerConfig};
pub use url_builder::{LocalUrlBuilder, UrlBuilder};
pub use variant::{
    Arguments, FlipDirection, ImageVariant, ImageVariantCollection, Operation, Variant, Variants,
};
