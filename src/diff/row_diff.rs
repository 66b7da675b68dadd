//! Row matching by normalized key

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

use crate::model::{CellValue, Table, TableSide};
use crate::normalize::{display_text, Normalizer};
use crate::resolve::KeyColumn;

use super::Anomaly;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Normalized key to row position for one table, in first-seen order
#[derive(Debug, Default)]
pub struct KeyIndex {
    entries: FxIndexMap<CellValue, usize>,
}

impl KeyIndex {
    /// Index every row of a table by its normalized key.
    ///
    /// Rows without a key are skipped. When a key repeats, the later row
    /// replaces the earlier one but keeps its position.
    pub fn build(
        table: &Table,
        side: TableSide,
        key: &KeyColumn,
        numeric: bool,
        normalizer: &Normalizer,
        anomalies: &mut Vec<Anomaly>,
    ) -> Self {
        let mut entries = FxIndexMap::default();

        for (row_idx, row) in table.rows.iter().enumerate() {
            let raw = row.get(key.index).unwrap_or(&EMPTY_CELL);
            let (canonical, degraded) = normalizer.normalize_checked(raw, numeric);

            if let Some(reason) = degraded {
                anomalies.push(Anomaly::CellNormalization {
                    side,
                    line: row.source_line,
                    column: key.name.clone(),
                    value: display_text(raw),
                    reason,
                });
            }

            if canonical.is_empty() {
                tracing::debug!("{} table line {}: empty identifier, skipped", side, row.source_line);
                anomalies.push(Anomaly::EmptyKey {
                    side,
                    line: row.source_line,
                });
                continue;
            }

            if let Some(previous) = entries.insert(canonical, row_idx) {
                let anomaly = Anomaly::DuplicateKey {
                    side,
                    key: display_text(raw),
                    first_line: table.rows[previous].source_line,
                    duplicate_line: row.source_line,
                };
                tracing::warn!("{}", anomaly);
                anomalies.push(anomaly);
            }
        }

        Self { entries }
    }

    /// Row position for a normalized key
    pub fn get(&self, key: &CellValue) -> Option<usize> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &CellValue) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys and row positions in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&CellValue, usize)> + '_ {
        self.entries.iter().map(|(k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Row positions carrying one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedRows {
    Both { old: usize, new: usize },
    OldOnly(usize),
    NewOnly(usize),
}

impl MatchedRows {
    pub fn old_row(self) -> Option<usize> {
        match self {
            MatchedRows::Both { old, .. } | MatchedRows::OldOnly(old) => Some(old),
            MatchedRows::NewOnly(_) => None,
        }
    }

    pub fn new_row(self) -> Option<usize> {
        match self {
            MatchedRows::Both { new, .. } | MatchedRows::NewOnly(new) => Some(new),
            MatchedRows::OldOnly(_) => None,
        }
    }
}

/// A key and the rows carrying it on either side
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMatch<'a> {
    pub key: &'a CellValue,
    pub rows: MatchedRows,
}

/// Align two key indexes over the union of their keys.
///
/// Old keys come first in old order, followed by keys only present in the
/// new table in new order.
pub fn match_keys<'a>(old: &'a KeyIndex, new: &'a KeyIndex) -> Vec<KeyMatch<'a>> {
    let mut matches = Vec::with_capacity(old.len().max(new.len()));

    for (key, old_row) in old.iter() {
        let rows = match new.get(key) {
            Some(new_row) => MatchedRows::Both {
                old: old_row,
                new: new_row,
            },
            None => MatchedRows::OldOnly(old_row),
        };
        matches.push(KeyMatch { key, rows });
    }

    for (key, new_row) in new.iter() {
        if !old.contains(key) {
            matches.push(KeyMatch {
                key,
                rows: MatchedRows::NewOnly(new_row),
            });
        }
    }

    matches
}
