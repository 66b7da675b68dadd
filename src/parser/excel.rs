//! Excel file parser (xlsx, xls, ods)

use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::config::Config;
use crate::model::{CellValue, Table};
use crate::normalize::parse_temporal;

use super::{header_names, Parser};

/// Sheets that usually document a workbook rather than hold its data
const METADATA_SHEETS: &[&str] = &["about", "readme", "info", "metadata", "codebook"];

/// Parser for Excel files
pub struct ExcelParser;

impl Parser for ExcelParser {
    fn parse(&self, path: &Path, config: &Config) -> Result<Table> {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

        let sheets = workbook.sheet_names();
        if sheets.is_empty() {
            bail!("No sheets found in workbook");
        }

        let sheet_name = choose_sheet(&sheets, config.sheet_name.as_deref(), |name| {
            workbook
                .worksheet_range(name)
                .map(|range| range.height() > 1)
                .unwrap_or(false)
        })
        .context("No sheets found in workbook")?;
        tracing::info!("{}: using sheet '{}'", path.display(), sheet_name);

        let range: Range<Data> = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        parse_range(&range)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "xlsx" | "xls" | "ods" | "xlsm" | "xlsb")
    }
}

/// Pick the sheet to compare.
///
/// A configured sheet wins when it exists. Otherwise the first sheet with
/// data rows that is not a metadata sheet is used, then the first sheet.
fn choose_sheet(
    sheets: &[String],
    configured: Option<&str>,
    mut has_data: impl FnMut(&str) -> bool,
) -> Option<String> {
    if let Some(name) = configured {
        if sheets.iter().any(|s| s == name) {
            return Some(name.to_string());
        }
        tracing::warn!(
            "configured sheet '{}' not found (available: {}), falling back to auto-detection",
            name,
            sheets.join(", ")
        );
    }

    sheets
        .iter()
        .filter(|s| !METADATA_SHEETS.contains(&s.to_lowercase().as_str()))
        .find(|s| has_data(s))
        .or_else(|| {
            let first = sheets.first();
            if let Some(first) = first {
                tracing::warn!("no sheet with data rows, falling back to first sheet '{}'", first);
            }
            first
        })
        .cloned()
}

fn parse_range(range: &Range<Data>) -> Result<Table> {
    let (row_count, col_count) = range.get_size();

    if row_count == 0 {
        bail!("Empty sheet");
    }

    // First row is header
    let header_row = range.rows().next().context("No header row found")?;
    let headers = header_names(header_row.iter().map(cell_to_string));
    let mut table = Table::with_headers(&headers);

    // Ranges start at the first used cell, which is not always row 1
    let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

    for (offset, row) in range.rows().skip(1).enumerate() {
        let cells: Vec<CellValue> = row.iter().take(col_count).map(convert_cell).collect();

        if cells.iter().all(CellValue::is_empty) {
            continue;
        }

        table.add_row(cells, first_line + offset + 1);
    }

    Ok(table)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        other => other.to_string(),
    }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Temporal(datetime),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_temporal(s)
            .map(CellValue::Temporal)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        // Error literals such as #DIV/0! are flagged by the normalizer
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_choose_configured_sheet() {
        let sheets = names(&["README", "Data", "Archive"]);
        assert_eq!(
            choose_sheet(&sheets, Some("Archive"), |_| true),
            Some("Archive".to_string())
        );
    }

    #[test]
    fn test_choose_sheet_skips_metadata() {
        let sheets = names(&["README", "Empty", "Data"]);
        let chosen = choose_sheet(&sheets, Some("Missing"), |name| name != "Empty");
        assert_eq!(chosen, Some("Data".to_string()));
    }

    #[test]
    fn test_choose_sheet_falls_back_to_first() {
        let sheets = names(&["About", "Blank"]);
        assert_eq!(choose_sheet(&sheets, None, |_| false), Some("About".to_string()));
        assert_eq!(choose_sheet(&[], None, |_| true), None);
    }

    #[test]
    fn test_convert_cell() {
        assert_eq!(convert_cell(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(convert_cell(&Data::String("  ".into())), CellValue::Empty);
        assert_eq!(convert_cell(&Data::Bool(true)), CellValue::Boolean(true));
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2024-02-03".into())),
            CellValue::from(chrono::NaiveDate::from_ymd_opt(2024, 2, 3).unwrap())
        );
    }
}
