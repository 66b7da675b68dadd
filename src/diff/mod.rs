//! Reconciliation engine for comparing two snapshots by identifier

mod anomaly;
mod row_diff;
mod schema_diff;

use serde::Serialize;

use crate::config::Config;
use crate::error::{KeyResolutionError, Result};
use crate::model::{CellValue, Row, Table, TableSide};
use crate::normalize::{display_text, Normalizer};
use crate::resolve::{check_comparable, KeyColumn, KeyResolver, ResolutionMethod};

pub use anomaly::Anomaly;
pub use row_diff::{match_keys, KeyIndex, KeyMatch, MatchedRows};
pub use schema_diff::{key_is_numeric, ColumnPair, SchemaDiff};

/// Fate of one key across the two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Added,
    Removed,
    Unchanged,
    Modified,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Added => write!(f, "added"),
            Classification::Removed => write!(f, "removed"),
            Classification::Unchanged => write!(f, "unchanged"),
            Classification::Modified => write!(f, "modified"),
        }
    }
}

/// A change to a single field of a record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Column name
    pub column: String,
    /// Value in the old table, `Empty` when the column is new
    pub old_value: CellValue,
    /// Value in the new table
    pub new_value: CellValue,
}

/// Classification of one key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordClassification {
    /// Identifier as written in the surviving row
    pub key: String,
    /// Normalized identifier used for matching
    pub canonical_key: CellValue,
    pub status: Classification,
    /// Differing fields in new-table column order; empty unless modified
    pub changes: Vec<FieldChange>,
    /// Row position in the old table
    #[serde(skip)]
    pub old_row: Option<usize>,
    /// Row position in the new table
    #[serde(skip)]
    pub new_row: Option<usize>,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
}

/// Counts per classification plus table sizes
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub modified: usize,
    pub cells_changed: usize,
    pub old_row_count: usize,
    pub new_row_count: usize,
    /// Distinct keys in the old table
    pub old_keys: usize,
    /// Distinct keys in the new table
    pub new_keys: usize,
}

impl Counts {
    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0 || self.modified > 0
    }

    /// Added, removed and modified records together
    pub fn total_changes(&self) -> usize {
        self.added + self.removed + self.modified
    }
}

/// Result of comparing two tables
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    /// Key column of the old table
    pub old_key: KeyColumn,
    /// Key column of the new table
    pub new_key: KeyColumn,
    /// One entry per key in the union of both tables
    pub records: Vec<RecordClassification>,
    pub counts: Counts,
    pub anomalies: Vec<Anomaly>,
}

impl ComparisonResult {
    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.counts.has_changes()
    }

    /// Records with a given classification
    pub fn with_status(
        &self,
        status: Classification,
    ) -> impl Iterator<Item = &RecordClassification> + '_ {
        self.records.iter().filter(move |r| r.status == status)
    }

    /// Get only added records
    pub fn added(&self) -> impl Iterator<Item = &RecordClassification> + '_ {
        self.with_status(Classification::Added)
    }

    /// Get only removed records
    pub fn removed(&self) -> impl Iterator<Item = &RecordClassification> + '_ {
        self.with_status(Classification::Removed)
    }

    /// Get only modified records
    pub fn modified(&self) -> impl Iterator<Item = &RecordClassification> + '_ {
        self.with_status(Classification::Modified)
    }

    /// Look up the classification of a key by its written form
    pub fn record(&self, key: &str) -> Option<&RecordClassification> {
        self.records.iter().find(|r| r.key == key)
    }

    /// Duplicate-key anomalies
    pub fn duplicate_keys(&self) -> impl Iterator<Item = &Anomaly> + '_ {
        self.anomalies
            .iter()
            .filter(|a| matches!(a, Anomaly::DuplicateKey { .. }))
    }
}

/// Main reconciliation engine
pub struct DiffEngine {
    config: Config,
    normalizer: Normalizer,
}

impl DiffEngine {
    /// Create a new engine with configuration
    pub fn new(config: Config) -> Self {
        let normalizer = Normalizer::new(&config);
        Self { config, normalizer }
    }

    /// Compare two tables whose key columns are already resolved
    pub fn diff(
        &self,
        old_table: &Table,
        old_key: &KeyColumn,
        new_table: &Table,
        new_key: &KeyColumn,
    ) -> ComparisonResult {
        let schema = SchemaDiff::compare(old_table, old_key, new_table, new_key, &self.config);
        let mut anomalies = schema.drift.clone();
        for drift in &schema.drift {
            tracing::warn!("{}", drift);
        }

        let numeric_key = key_is_numeric(old_table, old_key, new_table, new_key);
        let old_index = KeyIndex::build(
            old_table,
            TableSide::Old,
            old_key,
            numeric_key,
            &self.normalizer,
            &mut anomalies,
        );
        let new_index = KeyIndex::build(
            new_table,
            TableSide::New,
            new_key,
            numeric_key,
            &self.normalizer,
            &mut anomalies,
        );

        let mut counts = Counts {
            old_row_count: old_table.row_count(),
            new_row_count: new_table.row_count(),
            old_keys: old_index.len(),
            new_keys: new_index.len(),
            ..Counts::default()
        };
        let mut records = Vec::with_capacity(old_index.len().max(new_index.len()));

        for KeyMatch { key, rows } in match_keys(&old_index, &new_index) {
            let old_row = rows.old_row();
            let new_row = rows.new_row();
            let old = old_row.map(|i| &old_table.rows[i]);
            let new = new_row.map(|i| &new_table.rows[i]);

            let (status, changes) = match rows {
                MatchedRows::Both { old, new } => {
                    let changes = self.compare_rows(
                        &old_table.rows[old],
                        &new_table.rows[new],
                        &schema.pairs,
                        &mut anomalies,
                    );
                    if changes.is_empty() {
                        (Classification::Unchanged, changes)
                    } else {
                        (Classification::Modified, changes)
                    }
                }
                MatchedRows::OldOnly(_) => (Classification::Removed, Vec::new()),
                MatchedRows::NewOnly(_) => (Classification::Added, Vec::new()),
            };

            match status {
                Classification::Added => counts.added += 1,
                Classification::Removed => counts.removed += 1,
                Classification::Unchanged => counts.unchanged += 1,
                Classification::Modified => {
                    counts.modified += 1;
                    counts.cells_changed += changes.len();
                }
            }

            // The new row wins for display, matching the row a report highlights
            let written_key = match (new, old) {
                (Some(row), _) => row.get(new_key.index),
                (None, Some(row)) => row.get(old_key.index),
                (None, None) => None,
            };

            records.push(RecordClassification {
                key: written_key.map(display_text).unwrap_or_default(),
                canonical_key: key.clone(),
                status,
                changes,
                old_row,
                new_row,
                old_line: old.map(|r| r.source_line),
                new_line: new.map(|r| r.source_line),
            });
        }

        tracing::info!(
            "compared {} keys: {} added, {} removed, {} modified, {} unchanged",
            records.len(),
            counts.added,
            counts.removed,
            counts.modified,
            counts.unchanged
        );
        if !anomalies.is_empty() {
            tracing::warn!("{} anomalies recorded", anomalies.len());
        }

        ComparisonResult {
            old_key: old_key.clone(),
            new_key: new_key.clone(),
            records,
            counts,
            anomalies,
        }
    }

    /// Compare the paired fields of two rows sharing a key
    fn compare_rows(
        &self,
        old_row: &Row,
        new_row: &Row,
        pairs: &[ColumnPair],
        anomalies: &mut Vec<Anomaly>,
    ) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        for pair in pairs {
            let new_value = new_row.get(pair.new_index).cloned().unwrap_or(CellValue::Empty);
            let old_value = pair
                .old_index
                .and_then(|i| old_row.get(i))
                .cloned()
                .unwrap_or(CellValue::Empty);

            let (old_canonical, old_degraded) =
                self.normalizer.normalize_checked(&old_value, pair.numeric);
            let (new_canonical, new_degraded) =
                self.normalizer.normalize_checked(&new_value, pair.numeric);

            for (side, line, value, degraded) in [
                (TableSide::Old, old_row.source_line, &old_value, old_degraded),
                (TableSide::New, new_row.source_line, &new_value, new_degraded),
            ] {
                if let Some(reason) = degraded {
                    anomalies.push(Anomaly::CellNormalization {
                        side,
                        line,
                        column: pair.name.clone(),
                        value: display_text(value),
                        reason,
                    });
                }
            }

            if old_canonical != new_canonical {
                changes.push(FieldChange {
                    column: pair.name.clone(),
                    old_value,
                    new_value,
                });
            }
        }

        changes
    }
}

/// Reconcile two tables on key columns named by the caller.
///
/// Fails only when a named key column does not exist.
pub fn reconcile(
    old_table: &Table,
    old_key: &str,
    new_table: &Table,
    new_key: &str,
    config: &Config,
) -> Result<ComparisonResult> {
    let old_key = locate_key(old_table, old_key, TableSide::Old)?;
    let new_key = locate_key(new_table, new_key, TableSide::New)?;

    let mut result = DiffEngine::new(config.clone()).diff(old_table, &old_key, new_table, &new_key);
    if let Some(mismatch) = check_comparable(&old_key, &new_key) {
        result.anomalies.insert(0, mismatch);
    }
    Ok(result)
}

fn locate_key(table: &Table, name: &str, side: TableSide) -> Result<KeyColumn> {
    table
        .column_index(name)
        .map(|index| KeyColumn::new(table, index, ResolutionMethod::Caller))
        .ok_or_else(|| KeyResolutionError::MissingKeyColumn {
            side,
            column: name.to_string(),
        })
}

/// Resolve both key columns and reconcile the tables
pub fn compare(old_table: &Table, new_table: &Table, config: &Config) -> Result<ComparisonResult> {
    let resolver = KeyResolver::new(config);
    let old = resolver.resolve(old_table, TableSide::Old)?;
    let new = resolver.resolve(new_table, TableSide::New)?;

    let mut leading: Vec<Anomaly> = old.anomaly.into_iter().chain(new.anomaly).collect();
    leading.extend(check_comparable(&old.key, &new.key));

    let mut result = DiffEngine::new(config.clone()).diff(old_table, &old.key, new_table, &new.key);
    leading.append(&mut result.anomalies);
    result.anomalies = leading;
    Ok(result)
}
