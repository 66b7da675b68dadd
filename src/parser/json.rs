//! JSON records parser (array of objects or newline-delimited objects)

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::model::{CellValue, Table};

use super::{header_names, Parser};

/// Parser for JSON record files
pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(&self, path: &Path, _config: &Config) -> Result<Table> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to open JSON file: {}", path.display()))?;

        let records = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if matches!(ext.to_lowercase().as_str(), "jsonl" | "ndjson") => {
                read_lines(&content)?
            }
            _ => read_document(&content)?,
        };

        build_table(records)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "json" | "jsonl" | "ndjson")
    }
}

/// A record and its 1-based position in the source
type Record = (Value, usize);

fn read_document(content: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(content).context("Failed to parse JSON file")?;

    // Handle both arrays and single objects
    let array = match value {
        Value::Array(arr) => arr,
        Value::Object(_) => vec![value],
        _ => bail!("JSON must be an array or object"),
    };

    Ok(array.into_iter().enumerate().map(|(i, v)| (v, i + 1)).collect())
}

fn read_lines(content: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSON on line {}", i + 1))?;
        records.push((value, i + 1));
    }
    Ok(records)
}

fn build_table(records: Vec<Record>) -> Result<Table> {
    if records.is_empty() {
        bail!("JSON input has no records");
    }

    // Collect all unique keys across all objects to build column list
    let mut keys: IndexSet<String> = IndexSet::new();
    for (item, _) in &records {
        if let Value::Object(obj) = item {
            for key in obj.keys() {
                keys.insert(key.clone());
            }
        }
    }
    if keys.is_empty() {
        bail!("JSON records contain no fields");
    }

    let mut table = Table::with_headers(&header_names(keys.iter()));

    for (item, line) in &records {
        let cells: Vec<CellValue> = match item {
            Value::Object(obj) => object_cells(obj, &keys),
            _ => {
                tracing::warn!("record {} is not an object, skipped", line);
                continue;
            }
        };

        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        table.add_row(cells, *line);
    }

    Ok(table)
}

fn object_cells(obj: &Map<String, Value>, keys: &IndexSet<String>) -> Vec<CellValue> {
    keys.iter().map(|key| json_value_to_cell(obj.get(key))).collect()
}

/// Strings stay text so identifiers like `"007"` keep their spelling.
fn json_value_to_cell(value: Option<&Value>) -> CellValue {
    match value {
        None | Some(Value::Null) => CellValue::Empty,
        Some(Value::Bool(b)) => CellValue::Boolean(*b),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => CellValue::Number(f),
            None => CellValue::Text(n.to_string()),
        },
        Some(Value::String(s)) if s.trim().is_empty() => CellValue::Empty,
        Some(Value::String(s)) => CellValue::Text(s.clone()),
        // Nested values are compared by their serialized form
        Some(nested) => CellValue::Text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_value_to_cell() {
        assert_eq!(json_value_to_cell(None), CellValue::Empty);
        assert_eq!(json_value_to_cell(Some(&Value::Null)), CellValue::Empty);
        assert_eq!(json_value_to_cell(Some(&serde_json::json!(3))), CellValue::Number(3.0));
        assert_eq!(json_value_to_cell(Some(&serde_json::json!("007"))), CellValue::text("007"));
        assert_eq!(
            json_value_to_cell(Some(&serde_json::json!([1, 2]))),
            CellValue::text("[1,2]")
        );
    }

    #[test]
    fn test_array_document() {
        let records =
            read_document(r#"[{"id": 1, "name": "a"}, 5, {"id": 2, "extra": true}, {}]"#).unwrap();
        let table = build_table(records).unwrap();

        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "extra"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1].source_line, 3);
        assert_eq!(table.rows[1].get(1), Some(&CellValue::Empty));
    }

    #[test]
    fn test_newline_delimited() {
        let records = read_lines("{\"id\": \"A\"}\n\n{\"id\": \"B\"}\n").unwrap();
        let table = build_table(records).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[1].source_line, 3);
    }

    #[test]
    fn test_rejects_scalars() {
        assert!(read_document("42").is_err());
        assert!(build_table(Vec::new()).is_err());
    }
}
