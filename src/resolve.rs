//! Identifier column resolution
//!
//! A configured hint is tried first. Without one (or when it misses and
//! resolution is lenient) an ordered chain of detection strategies runs, and
//! the first strategy that matches decides the key column.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::config::Config;
use crate::diff::Anomaly;
use crate::error::{KeyResolutionError, Result};
use crate::model::{Table, TableSide};
use crate::normalize::{column_is_numeric, is_blank, Normalizer};

/// How a key column was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Matched the configured `id_column`
    Explicit,
    /// Header literally named `ID`
    NamedId,
    /// First column whose non-empty values are all distinct
    UniqueValues,
    /// Positional fallback to the first column
    FirstColumn,
    /// Named directly by the caller of the reconciler
    Caller,
}

impl std::fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionMethod::Explicit => write!(f, "configured"),
            ResolutionMethod::NamedId => write!(f, "named ID"),
            ResolutionMethod::UniqueValues => write!(f, "unique values"),
            ResolutionMethod::FirstColumn => write!(f, "first column"),
            ResolutionMethod::Caller => write!(f, "caller"),
        }
    }
}

/// A resolved identifier column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyColumn {
    /// Header name
    pub name: String,
    /// 0-based column position
    pub index: usize,
    /// Spreadsheet column letter (`A`, `B`, ...)
    pub letter: String,
    pub method: ResolutionMethod,
}

impl KeyColumn {
    pub fn new(table: &Table, index: usize, method: ResolutionMethod) -> Self {
        Self {
            name: table.columns[index].name.clone(),
            index,
            letter: index_to_column_letter(index),
            method,
        }
    }
}

impl std::fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.letter, self.name)
    }
}

/// Outcome of resolving one table's key column
#[derive(Debug, Clone)]
pub struct Resolution {
    pub key: KeyColumn,
    /// Set when a configured hint missed and detection took over
    pub anomaly: Option<Anomaly>,
}

/// One step of the auto-detection chain
pub trait KeyStrategy: Send + Sync {
    /// Method recorded when this strategy matches
    fn method(&self) -> ResolutionMethod;

    /// Column index this strategy picks, if any
    fn detect(&self, table: &Table, normalizer: &Normalizer) -> Option<usize>;
}

/// Picks a header literally named `ID`, ignoring case and surrounding whitespace
pub struct NamedIdStrategy;

impl KeyStrategy for NamedIdStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::NamedId
    }

    fn detect(&self, table: &Table, _normalizer: &Normalizer) -> Option<usize> {
        table
            .columns
            .iter()
            .position(|c| c.name.trim().eq_ignore_ascii_case("id"))
    }
}

/// Picks the first column whose non-empty values are unique after normalization
pub struct UniqueValuesStrategy;

impl KeyStrategy for UniqueValuesStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::UniqueValues
    }

    fn detect(&self, table: &Table, normalizer: &Normalizer) -> Option<usize> {
        (0..table.column_count()).find(|&col_idx| {
            let numeric = column_is_numeric(table.column_values(col_idx));
            let mut seen: FxHashSet<_> = FxHashSet::default();

            for value in table.column_values(col_idx) {
                if is_blank(value) {
                    continue;
                }
                if !seen.insert(normalizer.normalize(value, numeric)) {
                    return false;
                }
            }

            // An all-empty column identifies nothing
            !seen.is_empty()
        })
    }
}

/// Always picks the first column when there is one
pub struct FirstColumnStrategy;

impl KeyStrategy for FirstColumnStrategy {
    fn method(&self) -> ResolutionMethod {
        ResolutionMethod::FirstColumn
    }

    fn detect(&self, table: &Table, _normalizer: &Normalizer) -> Option<usize> {
        (table.column_count() > 0).then_some(0)
    }
}

/// Detection chain in priority order
pub fn default_strategies() -> Vec<Box<dyn KeyStrategy>> {
    vec![
        Box::new(NamedIdStrategy),
        Box::new(UniqueValuesStrategy),
        Box::new(FirstColumnStrategy),
    ]
}

/// Resolves which column supplies the identifier of each row
pub struct KeyResolver {
    hint: Option<String>,
    strict: bool,
    normalizer: Normalizer,
    strategies: Vec<Box<dyn KeyStrategy>>,
}

impl KeyResolver {
    /// Create a resolver with the default detection chain
    pub fn new(config: &Config) -> Self {
        Self {
            hint: config
                .id_column
                .as_ref()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
            strict: config.strict_key_resolution,
            normalizer: Normalizer::new(config),
            strategies: default_strategies(),
        }
    }

    /// Resolve the key column of one table
    pub fn resolve(&self, table: &Table, side: TableSide) -> Result<Resolution> {
        if table.column_count() == 0 {
            return Err(KeyResolutionError::NoColumns { side });
        }

        let Some(hint) = &self.hint else {
            return Ok(Resolution {
                key: self.auto_detect(table, side)?,
                anomaly: None,
            });
        };

        if let Some(index) = find_hint(table, hint) {
            let key = KeyColumn::new(table, index, ResolutionMethod::Explicit);
            tracing::info!("{} table: using configured ID column {}", side, key);
            return Ok(Resolution { key, anomaly: None });
        }

        if self.strict {
            return Err(KeyResolutionError::HintNotFound {
                side,
                hint: hint.clone(),
                available: table
                    .columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        tracing::warn!(
            "{} table: configured ID column '{}' not found, falling back to auto-detection",
            side,
            hint
        );
        let key = self.auto_detect(table, side)?;
        let anomaly = Anomaly::KeyHintFallback {
            side,
            hint: hint.clone(),
            resolved: key.name.clone(),
        };
        Ok(Resolution {
            key,
            anomaly: Some(anomaly),
        })
    }

    /// Run the detection chain left to right
    fn auto_detect(&self, table: &Table, side: TableSide) -> Result<KeyColumn> {
        for strategy in &self.strategies {
            match strategy.detect(table, &self.normalizer) {
                Some(index) => {
                    let key = KeyColumn::new(table, index, strategy.method());
                    tracing::info!(
                        "{} table: auto-detected ID column {} by {}",
                        side,
                        key,
                        key.method
                    );
                    return Ok(key);
                }
                None => tracing::debug!("{} table: {} strategy found no match", side, strategy.method()),
            }
        }

        Err(KeyResolutionError::NoColumns { side })
    }
}

/// Locate a hint by exact name, then case-insensitive name, then column letter
fn find_hint(table: &Table, hint: &str) -> Option<usize> {
    table
        .column_index(hint)
        .or_else(|| {
            table
                .columns
                .iter()
                .position(|c| c.name.trim().eq_ignore_ascii_case(hint))
        })
        .or_else(|| column_letter_to_index(hint).filter(|&i| i < table.column_count()))
}

/// Whether the two resolved keys identify the same thing.
///
/// Keys are comparable when both came from the configured override or when
/// their header names agree; otherwise schema drift is assumed and reported.
pub fn check_comparable(old: &KeyColumn, new: &KeyColumn) -> Option<Anomaly> {
    let both_explicit =
        old.method == ResolutionMethod::Explicit && new.method == ResolutionMethod::Explicit;
    if both_explicit || old.name.trim().eq_ignore_ascii_case(new.name.trim()) {
        return None;
    }

    tracing::warn!(
        "key columns differ between tables: '{}' vs '{}'",
        old.name,
        new.name
    );
    Some(Anomaly::KeyColumnMismatch {
        old_column: old.name.clone(),
        new_column: new.name.clone(),
    })
}

/// Convert a spreadsheet column letter (`A`, `Z`, `AA`) to a 0-based index
pub fn column_letter_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }

    let mut col: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let upper = ch.to_ascii_uppercase() as u8;
        col = col.checked_mul(26)?.checked_add((upper - b'A' + 1) as usize)?;
    }

    Some(col - 1)
}

/// Convert a 0-based index to a spreadsheet column letter
pub fn index_to_column_letter(index: usize) -> String {
    let mut col_index = index;
    let mut label = String::new();

    loop {
        let rem = (col_index % 26) as u8;
        label.push((b'A' + rem) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }

    label.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    fn people() -> Table {
        Table::from_rows(
            &["Region", "Name", "Code"],
            vec![
                vec!["north".into(), "Alice".into(), "A1".into()],
                vec!["north".into(), "Bob".into(), "B2".into()],
                vec!["south".into(), "alice".into(), "C3".into()],
            ],
        )
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter_to_index("A"), Some(0));
        assert_eq!(column_letter_to_index("c"), Some(2));
        assert_eq!(column_letter_to_index("Z"), Some(25));
        assert_eq!(column_letter_to_index("AA"), Some(26));
        assert_eq!(column_letter_to_index("A1"), None);
        assert_eq!(column_letter_to_index(""), None);

        assert_eq!(index_to_column_letter(0), "A");
        assert_eq!(index_to_column_letter(25), "Z");
        assert_eq!(index_to_column_letter(27), "AB");
        assert_eq!(index_to_column_letter(52), "BA");
    }

    #[test]
    fn test_named_id_wins() {
        let table = Table::from_rows(
            &["Name", " id "],
            vec![vec!["x".into(), 1.into()], vec!["y".into(), 1.into()]],
        );
        let resolution = KeyResolver::new(&Config::default())
            .resolve(&table, TableSide::Old)
            .unwrap();

        assert_eq!(resolution.key.index, 1);
        assert_eq!(resolution.key.method, ResolutionMethod::NamedId);
        assert!(resolution.anomaly.is_none());
    }

    #[test]
    fn test_unique_values_respects_case_setting() {
        let table = people();

        let sensitive = KeyResolver::new(&Config::default())
            .resolve(&table, TableSide::New)
            .unwrap();
        assert_eq!(sensitive.key.name, "Name");
        assert_eq!(sensitive.key.method, ResolutionMethod::UniqueValues);

        let insensitive = KeyResolver::new(&Config::default().with_case_sensitive(false))
            .resolve(&table, TableSide::New)
            .unwrap();
        assert_eq!(insensitive.key.name, "Code");
    }

    #[test]
    fn test_unique_values_skips_blank_cells_and_empty_columns() {
        let table = Table::from_rows(
            &["Notes", "Ref"],
            vec![
                vec![CellValue::Empty, "r1".into()],
                vec![" ".into(), CellValue::Empty],
                vec![CellValue::Empty, "r2".into()],
            ],
        );
        assert_eq!(UniqueValuesStrategy.detect(&table, &Normalizer::default()), Some(1));
    }

    #[test]
    fn test_numeric_duplicates_detected() {
        let table = Table::from_rows(
            &["Amount", "Ref"],
            vec![vec![5.into(), "a".into()], vec!["5.0".into(), "b".into()]],
        );
        assert_eq!(UniqueValuesStrategy.detect(&table, &Normalizer::default()), Some(1));
    }

    #[test]
    fn test_first_column_fallback() {
        let table = Table::from_rows(
            &["A", "B"],
            vec![vec![1.into(), 1.into()], vec![1.into(), 1.into()]],
        );
        let resolution = KeyResolver::new(&Config::default())
            .resolve(&table, TableSide::Old)
            .unwrap();
        assert_eq!(resolution.key.index, 0);
        assert_eq!(resolution.key.method, ResolutionMethod::FirstColumn);
    }

    #[test]
    fn test_hint_by_name_and_letter() {
        let table = people();

        let by_name = KeyResolver::new(&Config::default().with_id_column("code"))
            .resolve(&table, TableSide::Old)
            .unwrap();
        assert_eq!(by_name.key.name, "Code");
        assert_eq!(by_name.key.method, ResolutionMethod::Explicit);

        let by_letter = KeyResolver::new(&Config::default().with_id_column("b"))
            .resolve(&table, TableSide::Old)
            .unwrap();
        assert_eq!(by_letter.key.name, "Name");
        assert_eq!(by_letter.key.letter, "B");
    }

    #[test]
    fn test_missing_hint_falls_back() {
        let table = people();
        let resolution = KeyResolver::new(&Config::default().with_id_column("Customer"))
            .resolve(&table, TableSide::New)
            .unwrap();

        assert_eq!(resolution.key.name, "Name");
        assert_eq!(
            resolution.anomaly,
            Some(Anomaly::KeyHintFallback {
                side: TableSide::New,
                hint: "Customer".to_string(),
                resolved: "Name".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_hint_is_fatal_when_strict() {
        let table = Table::from_rows(&["ID", "Amount"], vec![vec![1.into(), 10.into()]]);
        let config = Config::default()
            .with_id_column("Name")
            .with_strict_key_resolution(true);

        let err = KeyResolver::new(&config)
            .resolve(&table, TableSide::Old)
            .unwrap_err();
        assert!(matches!(err, KeyResolutionError::HintNotFound { ref hint, .. } if hint == "Name"));
    }

    #[test]
    fn test_out_of_range_letter_misses() {
        let table = Table::from_rows(&["ID"], vec![vec![1.into()]]);
        let config = Config::default()
            .with_id_column("D")
            .with_strict_key_resolution(true);
        assert!(KeyResolver::new(&config).resolve(&table, TableSide::Old).is_err());
    }

    #[test]
    fn test_table_without_columns() {
        let table = Table::with_headers::<&str>(&[]);
        let err = KeyResolver::new(&Config::default())
            .resolve(&table, TableSide::New)
            .unwrap_err();
        assert_eq!(err, KeyResolutionError::NoColumns { side: TableSide::New });
    }

    #[test]
    fn test_check_comparable() {
        let table = people();
        let region = KeyColumn::new(&table, 0, ResolutionMethod::UniqueValues);
        let name = KeyColumn::new(&table, 1, ResolutionMethod::UniqueValues);

        assert!(check_comparable(&region, &region).is_none());
        assert!(matches!(
            check_comparable(&region, &name),
            Some(Anomaly::KeyColumnMismatch { .. })
        ));

        let explicit_a = KeyColumn::new(&table, 0, ResolutionMethod::Explicit);
        let explicit_b = KeyColumn::new(&table, 1, ResolutionMethod::Explicit);
        assert!(check_comparable(&explicit_a, &explicit_b).is_none());
    }
}
