use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use regex::{Captures, NoExpand, Regex};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use super::PathBuilder;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::file::File;
use crate::path_info;
use crate::sanitizer::{DefaultFilenameSanitizer, FilenameSanitizer, SanitizerConfig};

static PLACEHOLDER: &str = r"\{([A-Za-z]+)\}";

pub const DEFAULT_PATH_TEMPLATE: &str =
    "{model}{ds}{randomPath}{ds}{strippedId}{ds}{filename}.{extension}";
pub const DEFAULT_VARIANT_PATH_TEMPLATE: &str =
    "{model}{ds}{randomPath}{ds}{strippedId}{ds}{filename}.{hashedVariant}.{extension}";

/// Digest used for the `{randomPath}` fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomPathMethod {
    #[default]
    Sha1,
    Sha256,
}

impl RandomPathMethod {
    fn hex_digest(&self, input: &str) -> String {
        match self {
            RandomPathMethod::Sha1 => hex::encode(Sha1::digest(input.as_bytes())),
            RandomPathMethod::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
        }
    }

    /// Segments start at hex offset 2, two characters each
    fn max_levels(&self) -> usize {
        match self {
            RandomPathMethod::Sha1 => 19,
            RandomPathMethod::Sha256 => 31,
        }
    }
}

impl FromStr for RandomPathMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha1" => Ok(RandomPathMethod::Sha1),
            "sha256" => Ok(RandomPathMethod::Sha256),
            other => Err(Error::InvalidConfiguration(format!(
                "invalid random path hash method `{}`, expected `sha1` or `sha256`",
                other
            ))),
        }
    }
}

/// `strftime` formats of the date placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormat {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
    /// Used by `{date}`
    pub custom: String,
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            year: "%Y".to_string(),
            month: "%m".to_string(),
            day: "%d".to_string(),
            hour: "%H".to_string(),
            minute: "%M".to_string(),
            custom: "%Y-%m-%d".to_string(),
        }
    }
}

impl DateFormat {
    fn formats(&self) -> [&str; 6] {
        [
            &self.year,
            &self.month,
            &self.day,
            &self.hour,
            &self.minute,
            &self.custom,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathBuilderConfig {
    pub directory_separator: String,
    pub random_path: String,
    pub random_path_levels: usize,
    pub sanitize_filename: bool,
    pub beautify_filename: bool,
    pub sanitizer: SanitizerConfig,
    pub path_template: String,
    pub variant_path_template: String,
    pub date_format: DateFormat,
}

impl Default for PathBuilderConfig {
    fn default() -> Self {
        Self {
            directory_separator: "/".to_string(),
            random_path: "sha1".to_string(),
            random_path_levels: 3,
            sanitize_filename: true,
            beautify_filename: false,
            sanitizer: SanitizerConfig::default(),
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            variant_path_template: DEFAULT_VARIANT_PATH_TEMPLATE.to_string(),
            date_format: DateFormat::default(),
        }
    }
}

impl PathBuilderConfig {
    pub fn with_path_template(mut self, template: impl Into<String>) -> Self {
        self.path_template = template.into();
        self
    }

    pub fn with_variant_path_template(mut self, template: impl Into<String>) -> Self {
        self.variant_path_template = template.into();
        self
    }

    pub fn with_custom_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format.custom = format.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.directory_separator.is_empty() {
            return Err(Error::InvalidConfiguration(
                "directory separator must not be empty".to_string(),
            ));
        }

        let method: RandomPathMethod = self.random_path.parse()?;
        if self.random_path_levels > method.max_levels() {
            return Err(Error::InvalidConfiguration(format!(
                "random path levels must be at most {} for `{}`",
                method.max_levels(),
                self.random_path
            )));
        }

        for format in self.date_format.formats() {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(Error::InvalidConfiguration(format!(
                    "invalid date format `{}`",
                    format
                )));
            }
        }

        Ok(())
    }
}

/// Per-call replacements for parts of the builder configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverrides {
    pub path_template: Option<String>,
    pub variant_path_template: Option<String>,
    pub sanitize_filename: Option<bool>,
    pub beautify_filename: Option<bool>,
    pub random_path_levels: Option<usize>,
}

/// Template driven path builder
///
/// Supported placeholders: `{ds}`, `{model}`, `{collection}`, `{id}` / `{uuid}`,
/// `{strippedId}`, `{randomPath}`, `{modelId}`, `{extension}`, `{mimeType}`,
/// `{filename}`, `{hashedFilename}`, `{variant}`, `{hashedVariant}`, `{year}`,
/// `{month}`, `{day}`, `{hour}`, `{minute}` and `{date}`. Empty values never leave
/// doubled separators behind.
pub struct TemplatePathBuilder {
    config: PathBuilderConfig,
    method: RandomPathMethod,
    sanitizer: Arc<dyn FilenameSanitizer>,
    clock: Arc<dyn Clock>,
    placeholder: Regex,
    collapse: Regex,
}

impl TemplatePathBuilder {
    pub fn new(config: PathBuilderConfig) -> Result<Self> {
        config.validate()?;
        let method = config.random_path.parse()?;

        let ds = config.directory_separator.as_str();
        let mut runs = vec![r"/{2,}".to_string(), r"\\{2,}".to_string()];
        if ds != "/" && ds != "\\" {
            runs.push(format!("(?:{}){{2,}}", regex::escape(ds)));
        }
        let collapse = Regex::new(&runs.join("|"))
            .map_err(|e| Error::InvalidConfiguration(format!("directory separator: {}", e)))?;
        let placeholder = Regex::new(PLACEHOLDER)
            .map_err(|e| Error::InvalidConfiguration(format!("placeholder pattern: {}", e)))?;

        Ok(Self {
            sanitizer: Arc::new(DefaultFilenameSanitizer::new(config.sanitizer.clone())?),
            clock: Arc::new(SystemClock),
            placeholder,
            config,
            method,
            collapse,
        })
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn FilenameSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PathBuilderConfig {
        &self.config
    }

    pub fn path_with(&self, file: &File, overrides: &PathOverrides) -> String {
        self.build(file, None, overrides)
    }

    pub fn path_for_variant_with(
        &self,
        file: &File,
        variant: &str,
        overrides: &PathOverrides,
    ) -> String {
        self.build(file, Some(variant), overrides)
    }

    fn filename(&self, file: &File, sanitize: bool, beautify: bool) -> String {
        let mut filename = path_info::file_stem(file.filename()).to_string();
        if sanitize {
            filename = self.sanitizer.sanitize(&filename);
        }
        if beautify {
            filename = self.sanitizer.beautify(&filename);
        }
        filename
    }

    fn random_path(&self, uuid: &str, levels: usize) -> String {
        let digest = self.method.hex_digest(uuid);
        (0..levels)
            .map(|level| &digest[2 + level * 2..4 + level * 2])
            .collect::<Vec<_>>()
            .join(&self.config.directory_separator)
    }

    fn format_date(now: &DateTime<Utc>, format: &str) -> String {
        let mut out = String::new();
        // Formats are checked in `PathBuilderConfig::validate`
        let _ = write!(out, "{}", now.format(format));
        out
    }

    fn build(&self, file: &File, variant: Option<&str>, overrides: &PathOverrides) -> String {
        let config = &self.config;
        let ds = config.directory_separator.as_str();
        let variant = variant.filter(|v| !v.is_empty());

        let template = match variant {
            Some(_) => overrides
                .variant_path_template
                .as_deref()
                .unwrap_or(&config.variant_path_template),
            None => overrides
                .path_template
                .as_deref()
                .unwrap_or(&config.path_template),
        };
        let levels = overrides
            .random_path_levels
            .unwrap_or(config.random_path_levels)
            .min(self.method.max_levels());
        let filename = self.filename(
            file,
            overrides.sanitize_filename.unwrap_or(config.sanitize_filename),
            overrides.beautify_filename.unwrap_or(config.beautify_filename),
        );

        let uuid = file.uuid().to_string();
        let now = self.clock.now();
        let dates = &config.date_format;

        let expanded = self.placeholder.replace_all(template, |caps: &Captures| match &caps[1] {
            "ds" => ds.to_string(),
            "model" => file.model().unwrap_or_default().to_string(),
            "collection" => file.collection().unwrap_or_default().to_string(),
            "id" | "uuid" => uuid.clone(),
            "strippedId" => uuid.replace('-', ""),
            "randomPath" => self.random_path(&uuid, levels),
            "modelId" => file.model_id().unwrap_or_default().to_string(),
            "extension" => file.extension().unwrap_or_default().to_string(),
            "mimeType" => file.mime_type().to_string(),
            "filename" => filename.clone(),
            "hashedFilename" => hex::encode(Sha1::digest(filename.as_bytes())),
            "variant" => variant.unwrap_or_default().to_string(),
            "hashedVariant" => {
                let digest = hex::encode(Sha1::digest(variant.unwrap_or_default().as_bytes()));
                digest[..6].to_string()
            }
            "year" => Self::format_date(&now, &dates.year),
            "month" => Self::format_date(&now, &dates.month),
            "day" => Self::format_date(&now, &dates.day),
            "hour" => Self::format_date(&now, &dates.hour),
            "minute" => Self::format_date(&now, &dates.minute),
            "date" => Self::format_date(&now, &dates.custom),
            _ => caps[0].to_string(),
        });

        let mut path = self.collapse.replace_all(&expanded, NoExpand(ds)).into_owned();

        if path.ends_with('.') && path_info::extension(&path).is_none() {
            path.pop();
        }
        if path.len() > ds.len() && path.ends_with(ds) {
            path.truncate(path.len() - ds.len());
        }

        path
    }
}

impl PathBuilder for TemplatePathBuilder {
    fn path(&self, file: &File) -> Result<String> {
        Ok(self.build(file, None, &PathOverrides::default()))
    }

    fn path_for_variant(&self, file: &File, variant: &str) -> Result<String> {
        Ok(self.build(file, Some(variant), &PathOverrides::default()))
    }
}

impl fmt::Debug for TemplatePathBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatePathBuilder")
            .field("config", &self.config)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
