//! Colored terminal output

use std::io::Write;

use anyhow::Result;
use tabled::builder::Builder;
use tabled::settings::Style;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::diff::{Counts, FieldChange, RecordClassification};
use crate::model::{CellValue, Table};

use super::{OutputFormatter, Report};

/// Terminal output with colors
#[derive(Debug, Default)]
pub struct TerminalOutput {
    stats_only: bool,
}

impl TerminalOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print only the header and summary sections
    pub fn with_stats_only(mut self, stats_only: bool) -> Self {
        self.stats_only = stats_only;
        self
    }

    fn write_header(&self, report: &Report<'_>, writer: &mut dyn WriteColor) -> Result<()> {
        writeln!(writer, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            writer,
            " keydiff: {} → {}",
            report.old_path.display(),
            report.new_path.display()
        )?;
        writeln!(writer, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(writer)?;

        let result = report.result;
        writeln!(writer, "Key columns:")?;
        writeln!(writer, "  old: {} [{}]", result.old_key, result.old_key.method)?;
        writeln!(writer, "  new: {} [{}]", result.new_key, result.new_key.method)?;

        let config = report.config;
        writeln!(
            writer,
            "Matching: {}",
            if config.case_sensitive {
                "case-sensitive"
            } else {
                "case-insensitive"
            }
        )?;
        if !config.ignore_columns.is_empty() {
            writeln!(writer, "Ignored columns: {}", config.ignore_columns.join(", "))?;
        }
        writeln!(writer)?;
        Ok(())
    }

    fn write_summary(&self, counts: &Counts, writer: &mut dyn WriteColor) -> Result<()> {
        let mut builder = Builder::default();
        builder.push_record(["Metric".to_string(), "Count".to_string()]);
        for (label, value) in [
            ("Rows in old", counts.old_row_count),
            ("Rows in new", counts.new_row_count),
            ("Unchanged", counts.unchanged),
            ("Modified", counts.modified),
            ("Added", counts.added),
            ("Removed", counts.removed),
            ("Cells changed", counts.cells_changed),
        ] {
            builder.push_record([label.to_string(), value.to_string()]);
        }

        let mut table = builder.build();
        table.with(Style::modern());

        writeln!(writer, "Summary:")?;
        writeln!(writer, "{}", table)?;
        writeln!(writer)?;
        Ok(())
    }

    fn write_rows(
        &self,
        title: &str,
        color: Color,
        records: &[&RecordClassification],
        table: &Table,
        cells_of: impl Fn(&RecordClassification) -> Vec<String>,
        writer: &mut dyn WriteColor,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        write_colored(writer, color, &format!("{} ({}):", title, records.len()))?;
        writeln!(writer)?;

        let mut builder = Builder::default();
        builder.push_record(table.columns.iter().map(|c| c.name.clone()));
        for record in records {
            builder.push_record(cells_of(record));
        }
        let mut rendered = builder.build();
        rendered.with(Style::modern());

        writeln!(writer, "{}", rendered)?;
        writeln!(writer)?;
        Ok(())
    }

    fn write_modified(&self, report: &Report<'_>, writer: &mut dyn WriteColor) -> Result<()> {
        let modified: Vec<_> = report.result.modified().collect();
        if modified.is_empty() {
            return Ok(());
        }

        write_colored(writer, Color::Red, &format!("Modified ({}):", modified.len()))?;
        writeln!(writer)?;
        for record in modified {
            writeln!(writer, "  {}:", record.key)?;
            for change in &record.changes {
                self.write_field_change(change, writer)?;
            }
        }
        writeln!(writer)?;
        Ok(())
    }

    fn write_field_change(&self, change: &FieldChange, writer: &mut dyn WriteColor) -> Result<()> {
        let pct = percentage_change(&change.old_value, &change.new_value);
        let pct_str = pct.map(|p| format!(" ({:+.1}%)", p)).unwrap_or_default();

        writeln!(
            writer,
            "    {}: {} → {}{}",
            change.column,
            quoted(&change.old_value),
            quoted(&change.new_value),
            pct_str
        )?;
        Ok(())
    }

    fn write_anomalies(&self, report: &Report<'_>, writer: &mut dyn WriteColor) -> Result<()> {
        let anomalies = &report.result.anomalies;
        if anomalies.is_empty() {
            return Ok(());
        }

        write_colored(writer, Color::Magenta, &format!("Warnings ({}):", anomalies.len()))?;
        writeln!(writer)?;
        for anomaly in anomalies {
            writeln!(writer, "  {}", anomaly)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

impl OutputFormatter for TerminalOutput {
    fn render(&self, report: &Report<'_>, writer: &mut dyn WriteColor) -> Result<()> {
        let result = report.result;

        self.write_header(report, writer)?;
        self.write_summary(&result.counts, writer)?;

        if self.stats_only {
            return Ok(());
        }

        if !result.has_changes() {
            writeln!(writer, "No differences found.")?;
            writeln!(writer)?;
        }

        let added: Vec<_> = result.added().collect();
        self.write_rows(
            "Added",
            Color::Green,
            &added,
            report.new_table,
            |r| display_row(report.new_cells(r.new_row), report.new_table),
            writer,
        )?;

        let removed: Vec<_> = result.removed().collect();
        self.write_rows(
            "Removed",
            Color::Yellow,
            &removed,
            report.old_table,
            |r| display_row(report.old_cells(r.old_row), report.old_table),
            writer,
        )?;

        self.write_modified(report, writer)?;
        self.write_anomalies(report, writer)?;

        Ok(())
    }
}

fn write_colored(writer: &mut dyn WriteColor, color: Color, text: &str) -> Result<()> {
    writer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(writer, "{}", text)?;
    writer.reset()?;
    Ok(())
}

fn display_row(cells: &[CellValue], table: &Table) -> Vec<String> {
    (0..table.column_count())
        .map(|i| cells.get(i).map(|c| c.display().into_owned()).unwrap_or_default())
        .collect()
}

fn quoted(value: &CellValue) -> String {
    if value.is_empty() {
        "(empty)".to_string()
    } else {
        format!("'{}'", value.display())
    }
}

fn numeric_value(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Calculate percentage change for numeric values
pub fn percentage_change(old: &CellValue, new: &CellValue) -> Option<f64> {
    let old_num = numeric_value(old)?;
    let new_num = numeric_value(new)?;

    if old_num == 0.0 {
        return None;
    }

    Some((new_num - old_num) / old_num.abs() * 100.0)
}
