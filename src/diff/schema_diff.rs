//! Schema comparison logic
//!
//! The new table's columns drive the diff. Each of them is paired with the
//! same-named old column when one exists; the two key columns are paired
//! with each other regardless of their names.

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::model::{CellValue, Table, TableSide};
use crate::normalize::column_is_numeric;
use crate::resolve::KeyColumn;

use super::Anomaly;

/// A new-table column and its counterpart in the old table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPair {
    /// Column name as declared in the new table
    pub name: String,
    pub new_index: usize,
    /// `None` when the column only exists in the new table
    pub old_index: Option<usize>,
    /// Values on both sides are number-like
    pub numeric: bool,
}

/// Column pairing plus drift between two schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaDiff {
    /// Columns to compare field by field, in new-table order
    pub pairs: Vec<ColumnPair>,
    /// Columns present in only one of the tables
    pub drift: Vec<Anomaly>,
}

impl SchemaDiff {
    /// Pair the columns of two tables around their key columns
    pub fn compare(
        old_table: &Table,
        old_key: &KeyColumn,
        new_table: &Table,
        new_key: &KeyColumn,
        config: &Config,
    ) -> Self {
        let old_positions: FxHashMap<&str, usize> = old_table
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.index))
            .collect();
        let mut result = SchemaDiff::default();

        for new_col in &new_table.columns {
            if new_col.index == new_key.index {
                continue;
            }

            let old_index = old_positions
                .get(new_col.name.as_str())
                .copied()
                .filter(|&i| i != old_key.index);

            if old_index.is_none() {
                result.drift.push(Anomaly::SchemaDrift {
                    column: new_col.name.clone(),
                    present_in: TableSide::New,
                });
            }

            if config.is_ignored(&new_col.name) {
                continue;
            }

            let numeric = match old_index {
                Some(old_idx) => column_is_numeric(
                    new_table
                        .column_values(new_col.index)
                        .chain(old_table.column_values(old_idx)),
                ),
                None => column_is_numeric(new_table.column_values(new_col.index)),
            };

            result.pairs.push(ColumnPair {
                name: new_col.name.clone(),
                new_index: new_col.index,
                old_index,
                numeric,
            });
        }

        for old_col in &old_table.columns {
            if old_col.index == old_key.index {
                continue;
            }
            let in_new = new_table
                .column_index(&old_col.name)
                .is_some_and(|i| i != new_key.index);
            if !in_new {
                result.drift.push(Anomaly::SchemaDrift {
                    column: old_col.name.clone(),
                    present_in: TableSide::Old,
                });
            }
        }

        result
    }
}

/// Number-likeness of the key, judged across both tables
pub fn key_is_numeric(
    old_table: &Table,
    old_key: &KeyColumn,
    new_table: &Table,
    new_key: &KeyColumn,
) -> bool {
    let values: Vec<&CellValue> = old_table
        .column_values(old_key.index)
        .chain(new_table.column_values(new_key.index))
        .collect();
    column_is_numeric(values)
}
