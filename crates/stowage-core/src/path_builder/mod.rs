//! Storage path generation
//!
//! A [`PathBuilder`] turns a [`File`] into the relative path it is stored under.
//! [`TemplatePathBuilder`] expands placeholder templates such as
//! `{model}{ds}{randomPath}{ds}{strippedId}{ds}{filename}.{extension}`;
//! [`ConditionalPathBuilder`] picks a builder per file.

mod conditional;
mod template;

pub use conditional::ConditionalPathBuilder;
pub use template::{
    DateFormat, PathBuilderConfig, PathOverrides, RandomPathMethod, TemplatePathBuilder,
};

use crate::error::Result;
use crate::file::File;

pub trait PathBuilder: Send + Sync {
    /// Path of the original file
    fn path(&self, file: &File) -> Result<String>;

    /// Path of the variant `variant` of the file
    fn path_for_variant(&self, file: &File, variant: &str) -> Result<String>;
}
