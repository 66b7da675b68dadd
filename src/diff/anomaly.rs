//! Non-fatal irregularities recorded alongside a comparison result

use serde::Serialize;

use crate::model::TableSide;
use crate::normalize::DegradeReason;

/// A recoverable irregularity found while comparing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Two rows in one table share a key; the later row is kept
    DuplicateKey {
        side: TableSide,
        key: String,
        first_line: usize,
        duplicate_line: usize,
    },
    /// A row has no identifier value and was skipped
    EmptyKey { side: TableSide, line: usize },
    /// A cell could not be normalized and was compared as text
    CellNormalization {
        side: TableSide,
        line: usize,
        column: String,
        value: String,
        reason: DegradeReason,
    },
    /// A column exists in only one of the two tables
    SchemaDrift { column: String, present_in: TableSide },
    /// The two resolved key columns carry different names
    KeyColumnMismatch {
        old_column: String,
        new_column: String,
    },
    /// The configured identifier column was not found, auto-detection was used
    KeyHintFallback {
        side: TableSide,
        hint: String,
        resolved: String,
    },
}

impl Anomaly {
    /// Short machine-friendly name of the anomaly kind
    pub fn kind(&self) -> &'static str {
        match self {
            Anomaly::DuplicateKey { .. } => "duplicate_key",
            Anomaly::EmptyKey { .. } => "empty_key",
            Anomaly::CellNormalization { .. } => "cell_normalization",
            Anomaly::SchemaDrift { .. } => "schema_drift",
            Anomaly::KeyColumnMismatch { .. } => "key_column_mismatch",
            Anomaly::KeyHintFallback { .. } => "key_hint_fallback",
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::DuplicateKey {
                side,
                key,
                first_line,
                duplicate_line,
            } => write!(
                f,
                "duplicate key '{}' in {} table (line {} replaced by line {})",
                key, side, first_line, duplicate_line
            ),
            Anomaly::EmptyKey { side, line } => {
                write!(f, "{} table line {} has no identifier and was skipped", side, line)
            }
            Anomaly::CellNormalization {
                side,
                line,
                column,
                value,
                reason,
            } => write!(
                f,
                "{} table line {}, column '{}': {} '{}' compared as text",
                side, line, column, reason, value
            ),
            Anomaly::SchemaDrift { column, present_in } => {
                write!(f, "column '{}' only exists in the {} table", column, present_in)
            }
            Anomaly::KeyColumnMismatch {
                old_column,
                new_column,
            } => write!(
                f,
                "key columns differ: '{}' (old) vs '{}' (new)",
                old_column, new_column
            ),
            Anomaly::KeyHintFallback { side, hint, resolved } => write!(
                f,
                "identifier column '{}' not found in {} table, using '{}'",
                hint, side, resolved
            ),
        }
    }
}
