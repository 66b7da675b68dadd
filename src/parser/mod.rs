//! Parser layer for reading spreadsheet exports into tables

mod csv;
mod excel;
mod json;

use std::path::Path;

use anyhow::{bail, Result};
use rustc_hash::FxHashSet;

use crate::config::Config;
use crate::model::Table;

pub use self::csv::CsvParser;
pub use self::excel::ExcelParser;
pub use self::json::JsonParser;

/// Trait for parsing tabular data files
pub trait Parser: Send + Sync {
    /// Parse a file and return a Table
    fn parse(&self, path: &Path, config: &Config) -> Result<Table>;

    /// Check if this parser can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}

/// Factory for creating parsers based on file extension
pub struct ParserFactory {
    parsers: Vec<Box<dyn Parser>>,
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserFactory {
    /// Create a new parser factory with all supported parsers
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(CsvParser), Box::new(ExcelParser), Box::new(JsonParser)],
        }
    }

    /// Get a parser for the given file path
    pub fn get_parser(&self, path: &Path) -> Result<&dyn Parser> {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => detect_format(path).unwrap_or("csv").to_string(),
        };

        for parser in &self.parsers {
            if parser.supports_extension(&ext) {
                return Ok(parser.as_ref());
            }
        }

        bail!("Unsupported file format: {}", ext)
    }

    /// Parse a file using the appropriate parser
    pub fn parse(&self, path: &Path, config: &Config) -> Result<Table> {
        let parser = self.get_parser(path)?;
        let table = parser.parse(path, config)?;
        tracing::info!(
            "read {}: {} rows x {} columns",
            path.display(),
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }
}

/// Detect file format from content (for files without extension)
pub fn detect_format(path: &Path) -> Option<&'static str> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path).ok()?;
    let mut buffer = [0u8; 64];
    let bytes_read = file.read(&mut buffer).ok()?;

    if bytes_read >= 4 {
        // Excel ZIP format (xlsx)
        if &buffer[0..4] == b"PK\x03\x04" {
            return Some("xlsx");
        }

        // Old Excel format (xls)
        if &buffer[0..4] == b"\xD0\xCF\x11\xE0" {
            return Some("xls");
        }
    }

    let head = String::from_utf8_lossy(&buffer[..bytes_read]);
    let trimmed = head.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Some("json");
    }

    Some("csv")
}

/// Turn raw header cells into unique column names.
///
/// Blank headers become `Column_<n>` (1-based position); repeated names get
/// a `_2`, `_3`, ... suffix.
pub(crate) fn header_names<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut used: FxHashSet<String> = FxHashSet::default();
    let mut names = Vec::new();

    for (i, header) in raw.into_iter().enumerate() {
        let trimmed = header.as_ref().trim();
        let base = if trimmed.is_empty() {
            format!("Column_{}", i + 1)
        } else {
            trimmed.to_string()
        };

        let mut name = base.clone();
        let mut n = 1;
        while used.contains(&name) {
            n += 1;
            name = format!("{}_{}", base, n);
        }
        if name != header.as_ref() {
            tracing::debug!("header {} renamed to '{}'", i + 1, name);
        }
        used.insert(name.clone());
        names.push(name);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names() {
        let names = header_names(["ID", "", " Name ", "Name", "Name_2", "Name"]);
        assert_eq!(names, ["ID", "Column_2", "Name", "Name_2", "Name_2_2", "Name_3"]);
    }

    #[test]
    fn test_factory_picks_by_extension() {
        let factory = ParserFactory::new();
        assert!(factory.get_parser(Path::new("a.XLSX")).is_ok());
        assert!(factory.get_parser(Path::new("a.tsv")).is_ok());
        assert!(factory.get_parser(Path::new("a.parquet")).is_err());
    }
}
