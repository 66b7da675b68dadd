//! Configuration handling for keydiff

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Output format for comparison results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Html,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Options for a single comparison.
///
/// The value is immutable once built and is passed into every call, so two
/// comparisons with equal configs always produce equal results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Explicit identifier column: a header name or a spreadsheet letter (`A`, `B`, `AA`)
    pub id_column: Option<String>,
    /// Compare text case-sensitively
    pub case_sensitive: bool,
    /// Fail instead of auto-detecting when `id_column` is not found
    pub strict_key_resolution: bool,
    /// Columns excluded from field comparison
    pub ignore_columns: Vec<String>,
    /// For workbooks: which sheet to compare
    pub sheet_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_column: None,
            case_sensitive: true,
            strict_key_resolution: false,
            ignore_columns: Vec::new(),
            sheet_name: None,
        }
    }
}

impl Config {
    /// Create a config with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON mapping
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid configuration")
    }

    /// Load options from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Set the identifier column
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Enable or disable case-sensitive comparison
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Make a missing `id_column` fatal
    pub fn with_strict_key_resolution(mut self, strict: bool) -> Self {
        self.strict_key_resolution = strict;
        self
    }

    /// Set columns to ignore
    pub fn with_ignore_columns(mut self, columns: Vec<String>) -> Self {
        self.ignore_columns = columns;
        self
    }

    /// Set workbook sheet name
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    /// Whether a column is excluded from field comparison
    pub fn is_ignored(&self, column: &str) -> bool {
        self.ignore_columns.iter().any(|c| c == column)
    }
}
