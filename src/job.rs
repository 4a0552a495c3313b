//! Conversion jobs and their outcomes

use crate::error::ConversionError;
use crate::formats::{InputFormat, OutputFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Value attached to an extra pandoc flag
///
/// `Bool(true)` renders a bare `--flag`, `Bool(false)` and `Null` suppress
/// the flag entirely, anything else renders `--flag value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// Parse a CLI-style `value` (`true`/`false` become booleans, numbers stay text)
    pub fn parse_cli(raw: &str) -> Self {
        match raw {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            _ => OptionValue::Text(raw.to_string()),
        }
    }

    /// Argument rendered after the flag, if any
    pub fn render(&self) -> Option<String> {
        match self {
            OptionValue::Null | OptionValue::Bool(_) => None,
            OptionValue::Int(v) => Some(v.to_string()),
            OptionValue::Float(v) => Some(v.to_string()),
            OptionValue::Text(v) => Some(v.clone()),
        }
    }

    /// Whether the flag appears on the command line at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, OptionValue::Null | OptionValue::Bool(false))
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

/// Extra flags, rendered in key order
pub type ConversionOptions = BTreeMap<String, OptionValue>;

/// One requested input → output conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub input_format: Option<InputFormat>,
    pub output_format: OutputFormat,
    #[serde(default)]
    pub options: ConversionOptions,
}

impl ConversionJob {
    /// Create a job whose output sits next to the input with the format's extension
    pub fn new(input_path: impl Into<PathBuf>, output_format: OutputFormat) -> Self {
        let input_path = input_path.into();
        let output_path = Some(default_output_path(&input_path, output_format));
        Self {
            input_path,
            output_path,
            input_format: None,
            output_format,
            options: ConversionOptions::new(),
        }
    }

    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    /// Let pandoc write to stdout instead of a file
    pub fn without_output(mut self) -> Self {
        self.output_path = None;
        self
    }

    pub fn with_input_format(mut self, input_format: InputFormat) -> Self {
        self.input_format = Some(input_format);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options.extend(options);
        self
    }

    /// File name shown in notifications
    pub fn display_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }
}

/// `docs/intro.md` + html → `docs/intro.html`
pub fn default_output_path(input_path: &Path, output_format: OutputFormat) -> PathBuf {
    input_path.with_extension(output_format.extension())
}

/// Terminal result of attempting a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversionOutcome {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub error_message: Option<String>,
    pub duration_seconds: f64,
    pub command: Option<String>,
}

impl ConversionOutcome {
    pub fn succeeded(output_path: Option<PathBuf>, duration_seconds: f64, command: String) -> Self {
        Self {
            success: true,
            output_path,
            error_message: None,
            duration_seconds,
            command: Some(command),
        }
    }

    pub fn failed(error: &ConversionError) -> Self {
        Self {
            success: false,
            error_message: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration_seconds: f64) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }

    pub fn with_command(mut self, command: String) -> Self {
        self.command = Some(command);
        self
    }

    /// Error text, or a generic message when none was recorded
    pub fn error_text(&self) -> &str {
        self.error_message.as_deref().unwrap_or("Unknown error")
    }
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            match &self.output_path {
                Some(path) => write!(f, "converted to {} in {:.2}s", path.display(), self.duration_seconds),
                None => write!(f, "converted in {:.2}s", self.duration_seconds),
            }
        } else {
            write!(f, "failed: {}", self.error_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_derives_output_path() {
        let job = ConversionJob::new("docs/intro.md", OutputFormat::Latex);
        assert_eq!(job.output_path, Some(PathBuf::from("docs/intro.tex")));
        assert_eq!(job.display_name(), "intro.md");
    }

    #[test]
    fn test_option_value_rendering_rules() {
        assert!(OptionValue::Bool(true).is_enabled());
        assert!(!OptionValue::Bool(false).is_enabled());
        assert!(!OptionValue::Null.is_enabled());
        assert_eq!(OptionValue::Bool(true).render(), None);
        assert_eq!(OptionValue::Int(2).render(), Some("2".to_string()));
        assert_eq!(OptionValue::from("style.css").render(), Some("style.css".to_string()));
    }

    #[test]
    fn test_options_deserialize_untagged() {
        let json = r#"{"toc": true, "css": "style.css", "number-sections": false, "toc-depth": 2, "dpi": null}"#;
        let options: ConversionOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options["toc"], OptionValue::Bool(true));
        assert_eq!(options["css"], OptionValue::Text("style.css".into()));
        assert_eq!(options["toc-depth"], OptionValue::Int(2));
        assert_eq!(options["dpi"], OptionValue::Null);
    }

    #[test]
    fn test_parse_cli_values() {
        assert_eq!(OptionValue::parse_cli("true"), OptionValue::Bool(true));
        assert_eq!(OptionValue::parse_cli("false"), OptionValue::Bool(false));
        assert_eq!(OptionValue::parse_cli("3"), OptionValue::Text("3".into()));
    }

    #[test]
    fn test_failed_outcome_carries_message() {
        let outcome = ConversionOutcome::failed(&ConversionError::ToolUnavailable);
        assert!(!outcome.success);
        assert_eq!(outcome.error_text(), "Pandoc is not available on this system");
        assert!(outcome.to_string().starts_with("failed:"));
    }
}
