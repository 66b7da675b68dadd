//! CSV file parser

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::model::{CellValue, Table};

use super::{header_names, Parser};

/// Parser for CSV and TSV exports
pub struct CsvParser;

impl Parser for CsvParser {
    fn parse(&self, path: &Path, _config: &Config) -> Result<Table> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };

        read_table(BufReader::new(file), delimiter)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "csv" | "tsv" | "txt")
    }
}

/// Read delimited text with a header row into a table
pub(crate) fn read_table<R: std::io::Read>(reader: R, delimiter: u8) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();

    let mut table = Table::with_headers(&header_names(headers.iter()));

    for (line_num, result) in csv_reader.records().enumerate() {
        // +2 for 1-indexing and header
        let record = result.with_context(|| format!("Failed to read CSV row {}", line_num + 2))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(line_num + 2);

        let cells: Vec<CellValue> = record.iter().map(parse_cell_value).collect();
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }

        table.add_row(cells, line);
    }

    Ok(table)
}

/// Convert a raw CSV field into a cell.
///
/// Numbers and dates stay text here; the normalizer decides how they compare.
fn parse_cell_value(s: &str) -> CellValue {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return CellValue::Empty;
    }

    // Spreadsheet applications export booleans as TRUE/FALSE
    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }

    CellValue::Text(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value(""), CellValue::Empty);
        assert_eq!(parse_cell_value("   "), CellValue::Empty);
        assert_eq!(parse_cell_value("TRUE"), CellValue::Boolean(true));
        assert_eq!(parse_cell_value("false"), CellValue::Boolean(false));
        assert_eq!(parse_cell_value("42"), CellValue::text("42"));
        assert_eq!(parse_cell_value(" hello "), CellValue::text(" hello "));
    }

    #[test]
    fn test_read_table() {
        let data = "ID,Name,,Name\n1,Alice,x\n\n2,Bob,y,z,extra\n,,,\n";
        let table = read_table(data.as_bytes(), b',').unwrap();

        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ID", "Name", "Column_3", "Name_2"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].get(3), Some(&CellValue::Empty));
        assert_eq!(table.rows[1].cells.len(), 4);
        assert_eq!(table.rows[0].source_line, 2);
    }
}
