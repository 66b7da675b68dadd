//! Data model for tabular data representation

mod schema;
mod table;

pub use schema::Column;
pub use table::{CellValue, Row, Table};

/// Which snapshot a value, column, or anomaly belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSide {
    Old,
    New,
}

impl std::fmt::Display for TableSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSide::Old => write!(f, "old"),
            TableSide::New => write!(f, "new"),
        }
    }
}
