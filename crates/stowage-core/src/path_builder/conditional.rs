use std::sync::Arc;

use super::PathBuilder;
use crate::error::Result;
use crate::file::File;

type Condition = Box<dyn Fn(&File) -> bool + Send + Sync>;

/// Delegates to the first builder whose condition matches the file, or to the
/// default builder when none does.
pub struct ConditionalPathBuilder {
    builders: Vec<(Condition, Arc<dyn PathBuilder>)>,
    default: Arc<dyn PathBuilder>,
}

impl ConditionalPathBuilder {
    pub fn new(default: Arc<dyn PathBuilder>) -> Self {
        Self {
            builders: Vec::new(),
            default,
        }
    }

    pub fn add_path_builder<F>(mut self, condition: F, builder: Arc<dyn PathBuilder>) -> Self
    where
        F: Fn(&File) -> bool + Send + Sync + 'static,
    {
        self.builders.push((Box::new(condition), builder));
        self
    }

    fn select(&self, file: &File) -> &dyn PathBuilder {
        self.builders
            .iter()
            .find(|(condition, _)| condition(file))
            .map(|(_, builder)| builder.as_ref())
            .unwrap_or(self.default.as_ref())
    }
}

impl PathBuilder for ConditionalPathBuilder {
    fn path(&self, file: &File) -> Result<String> {
        self.select(file).path(file)
    }

    fn path_for_variant(&self, file: &File, variant: &str) -> Result<String> {
        self.select(file).path_for_variant(file, variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_builder::{PathBuilderConfig, TemplatePathBuilder};

    fn template(template: &str) -> Arc<dyn PathBuilder> {
        let config = PathBuilderConfig::default()
            .with_path_template(template)
            .with_variant_path_template(format!("{}.{{hashedVariant}}", template));
        Arc::new(TemplatePathBuilder::new(config).unwrap())
    }

    #[test]
    fn test_first_matching_condition_wins() {
        let builder = ConditionalPathBuilder::new(template("default{ds}{filename}"))
            .add_path_builder(
                |file| file.mime_type().starts_with("image/"),
                template("images{ds}{filename}"),
            )
            .add_path_builder(|file| file.extension() == Some("jpg"), template("jpg{ds}{filename}"));

        let photo = File::create("photo.jpg", 10, "image/jpeg", "local");
        let doc = File::create("notes.txt", 10, "text/plain", "local");

        assert_eq!(builder.path(&photo).unwrap(), "images/photo");
        assert_eq!(builder.path(&doc).unwrap(), "default/notes");
        assert_eq!(
            builder.path_for_variant(&photo, "resizeAndFlip").unwrap(),
            "images/photo.7ae239"
        );
    }
}
