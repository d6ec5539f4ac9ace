//! Filename sanitizing
//!
//! `sanitize` replaces characters that are reserved on common filesystems (and,
//! optionally, characters that are unsafe in URLs) with `-`. `beautify` turns
//! `file   name.zip`, `file___name.zip` and `file--.--.-.--name.zip` into
//! `file-name.zip` / `file.name.zip` and lowercases the result.

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path_info;

static FILESYSTEM_RESERVED: &str = r#"[<>:"/\\|?*]"#;
static URL_UNSAFE: &str = r"[{}^~`]";
static URI_RESERVED: &str = r"[#\[\]@!$&'()+,;=]";
static NON_PRINTING: &str = r"[\x{7F}\x{A0}\x{AD}]";
static CONTROL: &str = r"[\x00-\x1F]";

static SPACES: &str = r"[ _-]+";
static DASHED_DOTS: &str = r"-*\.-*";
static DOT_RUNS: &str = r"\.{2,}";
static NON_ALPHANUMERIC: &str = r"[^a-zA-Z0-9]";

pub trait FilenameSanitizer: Send + Sync {
    fn sanitize(&self, filename: &str) -> String;

    fn beautify(&self, filename: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub lowercase: bool,
    pub remove_all_non_alphanumerical: bool,
    pub beautify: bool,
    pub enforce_max_length: bool,
    pub max_length: usize,
    pub remove_control_chars: bool,
    pub remove_non_printing_chars: bool,
    pub remove_uri_reserved_chars: bool,
    pub url_safe: bool,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            lowercase: false,
            remove_all_non_alphanumerical: false,
            beautify: true,
            enforce_max_length: true,
            max_length: 255,
            remove_control_chars: true,
            remove_non_printing_chars: true,
            remove_uri_reserved_chars: false,
            url_safe: false,
        }
    }
}

/// Regex based sanitizer
#[derive(Debug, Clone)]
pub struct DefaultFilenameSanitizer {
    config: SanitizerConfig,
    replace: Regex,
    spaces: Regex,
    dashed_dots: Regex,
    dot_runs: Regex,
    non_alphanumeric: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern)
        .with_context(|| format!("Failed to compile sanitizer pattern {}", pattern))?;
    Ok(regex)
}

impl DefaultFilenameSanitizer {
    pub fn new(config: SanitizerConfig) -> Result<Self> {
        let mut classes = vec![FILESYSTEM_RESERVED];
        if config.url_safe {
            classes.push(URL_UNSAFE);
        }
        if config.remove_uri_reserved_chars {
            classes.push(URI_RESERVED);
        }
        if config.remove_non_printing_chars {
            classes.push(NON_PRINTING);
        }
        if config.remove_control_chars {
            classes.push(CONTROL);
        }

        Ok(Self {
            replace: compile(&classes.join("|"))?,
            spaces: compile(SPACES)?,
            dashed_dots: compile(DASHED_DOTS)?,
            dot_runs: compile(DOT_RUNS)?,
            non_alphanumeric: compile(NON_ALPHANUMERIC)?,
            config,
        })
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    fn remove_all_non_alphanumerical(&self, filename: &str) -> String {
        let stem = self.non_alphanumeric.replace_all(path_info::file_stem(filename), "");
        match path_info::extension(filename) {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem.into_owned(),
        }
    }

    fn enforce_max_length(filename: &str, max_length: usize) -> String {
        let ext = path_info::extension(filename);
        let budget = max_length.saturating_sub(ext.map(|e| e.len() + 1).unwrap_or(0));

        let stem = match ext {
            Some(e) => &filename[..filename.len() - e.len() - 1],
            None => filename,
        };
        let mut cut = budget.min(stem.len());
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }

        match ext {
            Some(e) => format!("{}.{}", &stem[..cut], e),
            None => stem[..cut].to_string(),
        }
    }
}

impl FilenameSanitizer for DefaultFilenameSanitizer {
    fn sanitize(&self, filename: &str) -> String {
        let mut result = self.replace.replace_all(filename, "-").into_owned();

        if self.config.lowercase {
            result = result.to_lowercase();
        }

        if self.config.remove_all_non_alphanumerical {
            result = self.remove_all_non_alphanumerical(&result);
        }

        if self.config.beautify {
            result = self.beautify(&result);
        }

        if self.config.enforce_max_length {
            result = Self::enforce_max_length(&result, self.config.max_length);
        }

        result
    }

    fn beautify(&self, filename: &str) -> String {
        let result = self.spaces.replace_all(filename, "-");
        let result = self.dashed_dots.replace_all(&result, ".");
        let result = self.dot_runs.replace_all(&result, ".");

        result
            .to_lowercase()
            .trim_matches(|c| c == '.' || c == '-')
            .to_string()
    }
}

/// Leaves filenames untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFilenameSanitizer;

impl FilenameSanitizer for NoopFilenameSanitizer {
    fn sanitize(&self, filename: &str) -> String {
        filename.to_string()
    }

    fn beautify(&self, filename: &str) -> String {
        filename.to_string()
    }
}
