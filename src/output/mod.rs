//! Output formatting for comparison results

mod html;
mod json;
mod terminal;

use std::path::Path;

use anyhow::Result;
use termcolor::{ColorChoice, StandardStream, WriteColor};

use crate::config::{Config, OutputFormat};
use crate::diff::ComparisonResult;
use crate::model::{CellValue, Table};

pub use html::HtmlOutput;
pub use json::JsonOutput;
pub use terminal::TerminalOutput;

/// Everything a formatter needs to describe one comparison
pub struct Report<'a> {
    pub result: &'a ComparisonResult,
    pub old_table: &'a Table,
    pub new_table: &'a Table,
    pub old_path: &'a Path,
    pub new_path: &'a Path,
    pub config: &'a Config,
}

impl<'a> Report<'a> {
    /// Cells of a row in the old table, empty when the row is absent
    pub fn old_cells(&self, row: Option<usize>) -> &'a [CellValue] {
        row.and_then(|i| self.old_table.rows.get(i))
            .map(|r| r.cells.as_slice())
            .unwrap_or(&[])
    }

    /// Cells of a row in the new table, empty when the row is absent
    pub fn new_cells(&self, row: Option<usize>) -> &'a [CellValue] {
        row.and_then(|i| self.new_table.rows.get(i))
            .map(|r| r.cells.as_slice())
            .unwrap_or(&[])
    }
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Render a comparison report to a writer
    fn render(&self, report: &Report<'_>, writer: &mut dyn WriteColor) -> Result<()>;
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter based on format type
    pub fn create(format: OutputFormat, stats_only: bool) -> Box<dyn OutputFormatter> {
        match format {
            OutputFormat::Terminal => Box::new(TerminalOutput::new().with_stats_only(stats_only)),
            OutputFormat::Json => Box::new(JsonOutput::new().with_stats_only(stats_only)),
            OutputFormat::Html => Box::new(HtmlOutput::new()),
        }
    }
}

/// Render a report to stdout, colored when stdout is a terminal
pub fn render_to_stdout(report: &Report<'_>, format: OutputFormat, stats_only: bool) -> Result<()> {
    let formatter = OutputFactory::create(format, stats_only);
    let choice = if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    formatter.render(report, &mut stdout)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::diff::compare;

    /// Two small tables with one of each classification
    pub fn sample() -> (Table, Table) {
        let old = Table::from_rows(
            &["ID", "Name", "Score"],
            vec![
                vec![1.into(), "Alice".into(), 10.into()],
                vec![2.into(), "Bob".into(), 20.into()],
                vec![3.into(), "Carol".into(), 30.into()],
            ],
        );
        let new = Table::from_rows(
            &["ID", "Name", "Score"],
            vec![
                vec![1.into(), "Alice".into(), 10.into()],
                vec![2.into(), "Bob".into(), 25.into()],
                vec![4.into(), "Dan <b>".into(), 40.into()],
            ],
        );
        (old, new)
    }

    /// Render the sample comparison with a formatter into a string
    pub fn render(formatter: &dyn OutputFormatter) -> String {
        let (old, new) = sample();
        let config = Config::default();
        let result = compare(&old, &new, &config).unwrap();
        let report = Report {
            result: &result,
            old_table: &old,
            new_table: &new,
            old_path: Path::new("old.csv"),
            new_path: Path::new("new.csv"),
            config: &config,
        };

        let mut buffer = termcolor::NoColor::new(Vec::new());
        formatter.render(&report, &mut buffer).unwrap();
        String::from_utf8(buffer.into_inner()).unwrap()
    }
}
