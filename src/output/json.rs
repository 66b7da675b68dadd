//! JSON output format

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use termcolor::WriteColor;

use crate::diff::{Anomaly, Counts, RecordClassification};
use crate::resolve::KeyColumn;

use super::{OutputFormatter, Report};

/// JSON output formatter
pub struct JsonOutput {
    pretty: bool,
    stats_only: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self {
            pretty: true,
            stats_only: false,
        }
    }

    pub fn compact() -> Self {
        Self {
            pretty: false,
            ..Self::new()
        }
    }

    /// Leave out the per-record list
    pub fn with_stats_only(mut self, stats_only: bool) -> Self {
        self.stats_only = stats_only;
        self
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    old_file: String,
    new_file: String,
    old_key: &'a KeyColumn,
    new_key: &'a KeyColumn,
    counts: &'a Counts,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<&'a [RecordClassification]>,
    anomalies: &'a [Anomaly],
}

impl OutputFormatter for JsonOutput {
    fn render(&self, report: &Report<'_>, writer: &mut dyn WriteColor) -> Result<()> {
        let result = report.result;
        let output = JsonReport {
            old_file: report.old_path.display().to_string(),
            new_file: report.new_path.display().to_string(),
            old_key: &result.old_key,
            new_key: &result.new_key,
            counts: &result.counts,
            records: (!self.stats_only).then_some(result.records.as_slice()),
            anomalies: &result.anomalies,
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &output)?;
        } else {
            serde_json::to_writer(&mut *writer, &output)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}
