//! HTML report output
//!
//! The report mirrors the new table: added rows are shaded green, changed
//! cells are red with the previous value on hover, and removed rows are
//! listed in their own orange section.

use std::io::Write;

use anyhow::{Context as _, Result};
use serde::Serialize;
use tera::{Context, Tera};
use termcolor::WriteColor;

use crate::diff::{Classification, Counts};

use super::{OutputFormatter, Report};

/// HTML report output
pub struct HtmlOutput;

impl HtmlOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct HtmlView<'a> {
    old_file: String,
    new_file: String,
    old_key: String,
    new_key: String,
    case_sensitive: bool,
    counts: &'a Counts,
    columns: Vec<&'a str>,
    rows: Vec<HtmlRow>,
    removed_columns: Vec<&'a str>,
    removed: Vec<Vec<String>>,
    anomalies: Vec<String>,
}

#[derive(Serialize)]
struct HtmlRow {
    status: Classification,
    cells: Vec<HtmlCell>,
}

#[derive(Serialize)]
struct HtmlCell {
    value: String,
    /// Previous value when the cell changed
    previous: Option<String>,
}

fn build_view<'a>(report: &Report<'a>) -> HtmlView<'a> {
    let result = report.result;

    let mut present: Vec<_> = result.records.iter().filter(|r| r.new_row.is_some()).collect();
    present.sort_by_key(|r| r.new_row);

    let rows = present
        .into_iter()
        .map(|record| {
            let cells = report.new_cells(record.new_row);
            let cells = report
                .new_table
                .columns
                .iter()
                .map(|column| {
                    let value = cells
                        .get(column.index)
                        .map(|c| c.display().into_owned())
                        .unwrap_or_default();
                    let previous = record
                        .changes
                        .iter()
                        .find(|change| change.column == column.name)
                        .map(|change| change.old_value.display().into_owned());
                    HtmlCell { value, previous }
                })
                .collect();
            HtmlRow {
                status: record.status,
                cells,
            }
        })
        .collect();

    let removed = result
        .removed()
        .map(|record| {
            let cells = report.old_cells(record.old_row);
            (0..report.old_table.column_count())
                .map(|i| cells.get(i).map(|c| c.display().into_owned()).unwrap_or_default())
                .collect()
        })
        .collect();

    HtmlView {
        old_file: report.old_path.display().to_string(),
        new_file: report.new_path.display().to_string(),
        old_key: result.old_key.to_string(),
        new_key: result.new_key.to_string(),
        case_sensitive: report.config.case_sensitive,
        counts: &result.counts,
        columns: report.new_table.columns.iter().map(|c| c.name.as_str()).collect(),
        rows,
        removed_columns: report.old_table.columns.iter().map(|c| c.name.as_str()).collect(),
        removed,
        anomalies: result.anomalies.iter().map(ToString::to_string).collect(),
    }
}

impl OutputFormatter for HtmlOutput {
    fn render(&self, report: &Report<'_>, writer: &mut dyn WriteColor) -> Result<()> {
        let view = build_view(report);
        let context = Context::from_serialize(&view).context("Failed to build report context")?;
        let html = Tera::one_off(TEMPLATE, &context, true).context("Failed to render HTML report")?;

        writer.write_all(html.as_bytes())?;
        Ok(())
    }
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>keydiff: {{ old_file }} → {{ new_file }}</title>
  <style>
    body { font-family: Calibri, Arial, sans-serif; margin: 2rem; color: #222; }
    h1 { color: #000080; }
    h2 { border-bottom: 1px solid #ccc; padding-bottom: 0.25rem; }
    table { border-collapse: collapse; margin-bottom: 1.5rem; }
    th, td { border: 1px solid #ccc; padding: 0.35rem 0.6rem; text-align: left; }
    th { background: #f2f2f2; }
    tr.added td { color: #008000; font-weight: bold; background: #F0FFF0; }
    td.changed { color: #CC0000; font-weight: bold; }
    table.removed td { color: #FF8C00; font-weight: bold; background: #FFF8DC; }
    .legend span { display: inline-block; margin-right: 1.5rem; font-weight: bold; }
    ul.warnings li { color: #8a6d3b; }
  </style>
</head>
<body>
  <h1>keydiff report</h1>
  <p>{{ old_file }} → {{ new_file }}</p>

  <h2>Summary</h2>
  <table class="summary">
    <tr><th>Key column (old)</th><td>{{ old_key }}</td></tr>
    <tr><th>Key column (new)</th><td>{{ new_key }}</td></tr>
    <tr><th>Case-sensitive</th><td>{% if case_sensitive %}yes{% else %}no{% endif %}</td></tr>
    <tr><th>Rows in old</th><td>{{ counts.old_row_count }}</td></tr>
    <tr><th>Rows in new</th><td>{{ counts.new_row_count }}</td></tr>
    <tr><th>Unchanged</th><td>{{ counts.unchanged }}</td></tr>
    <tr><th>Modified</th><td>{{ counts.modified }}</td></tr>
    <tr><th>Added</th><td>{{ counts.added }}</td></tr>
    <tr><th>Removed</th><td>{{ counts.removed }}</td></tr>
    <tr><th>Cells changed</th><td>{{ counts.cells_changed }}</td></tr>
  </table>
  <p class="legend">
    <span style="color: #CC0000">Changed cell</span>
    <span style="color: #008000">Added record</span>
    <span style="color: #FF8C00">Removed record</span>
  </p>

  <h2>Records</h2>
  <table class="records">
    <tr>{% for column in columns %}<th>{{ column }}</th>{% endfor %}</tr>
    {% for row in rows %}
    <tr class="{{ row.status }}">
      {% for cell in row.cells %}{% if cell.previous is string %}<td class="changed" title="was: {{ cell.previous }}">{{ cell.value }}</td>{% else %}<td>{{ cell.value }}</td>{% endif %}{% endfor %}
    </tr>
    {% endfor %}
  </table>

  {% if removed | length > 0 %}
  <h2>Removed records</h2>
  <table class="removed">
    <tr>{% for column in removed_columns %}<th>{{ column }}</th>{% endfor %}</tr>
    {% for row in removed %}
    <tr>{% for value in row %}<td>{{ value }}</td>{% endfor %}</tr>
    {% endfor %}
  </table>
  {% endif %}

  {% if anomalies | length > 0 %}
  <h2>Warnings</h2>
  <ul class="warnings">
    {% for anomaly in anomalies %}<li>{{ anomaly }}</li>{% endfor %}
  </ul>
  {% endif %}
</body>
</html>
"#;
