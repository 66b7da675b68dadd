use std::path::PathBuf;

use keydiff::diff::Anomaly;
use keydiff::model::TableSide;
use keydiff::parser::ParserFactory;
use keydiff::resolve::ResolutionMethod;
use keydiff::{
    compare, reconcile, CellValue, Classification, ComparisonResult, Config, KeyResolutionError,
    Table,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load(name: &str, config: &Config) -> Table {
    let path = fixtures_dir().join(name);
    ParserFactory::new()
        .parse(&path, config)
        .unwrap_or_else(|e| panic!("cannot read {}: {e:#}", path.display()))
}

fn load_and_compare(old: &str, new: &str, config: &Config) -> ComparisonResult {
    let old = load(old, config);
    let new = load(new, config);
    compare(&old, &new, config).unwrap()
}

fn statuses(result: &ComparisonResult) -> Vec<(String, Classification)> {
    result
        .records
        .iter()
        .map(|r| (r.key.clone(), r.status))
        .collect()
}

// -------------------------------------------------------------------------
// Customer snapshots (CSV)
// -------------------------------------------------------------------------

#[test]
fn customers_classified_by_identifier() {
    let config = Config::default();
    let result = load_and_compare("customers_v1.csv", "customers_v2.csv", &config);

    assert_eq!(result.old_key.name, "Customer ID");
    assert_eq!(result.old_key.method, ResolutionMethod::UniqueValues);
    assert_eq!(
        statuses(&result),
        vec![
            ("C001".to_string(), Classification::Modified),
            ("C002".to_string(), Classification::Modified),
            ("C003".to_string(), Classification::Removed),
            ("C004".to_string(), Classification::Unchanged),
            ("C005".to_string(), Classification::Added),
        ]
    );

    let alice = result.record("C001").unwrap();
    assert_eq!(alice.changes.len(), 1);
    assert_eq!(alice.changes[0].column, "Email");

    let bob = result.record("C002").unwrap();
    assert_eq!(bob.changes.len(), 1);
    assert_eq!(bob.changes[0].column, "Balance");
    assert_eq!(bob.old_line, Some(3));
    assert_eq!(bob.new_line, Some(3));

    assert_eq!(result.counts.cells_changed, 2);
    assert!(result.has_changes());
}

#[test]
fn customers_case_insensitive() {
    let config = Config::default().with_case_sensitive(false);
    let result = load_and_compare("customers_v1.csv", "customers_v2.csv", &config);

    assert_eq!(result.record("C001").unwrap().status, Classification::Unchanged);
    assert_eq!(result.counts.modified, 1);
    assert_eq!(result.counts.unchanged, 2);
}

#[test]
fn customers_schema_drift_recorded() {
    let result = load_and_compare("customers_v1.csv", "customers_v2.csv", &Config::default());

    assert!(result.anomalies.contains(&Anomaly::SchemaDrift {
        column: "Notes".to_string(),
        present_in: TableSide::Old,
    }));
    // Drift alone does not modify records
    assert_eq!(result.record("C004").unwrap().status, Classification::Unchanged);
}

#[test]
fn customers_ignored_column() {
    let config = Config::default().with_ignore_columns(vec!["Balance".to_string()]);
    let result = load_and_compare("customers_v1.csv", "customers_v2.csv", &config);

    assert_eq!(result.record("C002").unwrap().status, Classification::Unchanged);
    assert_eq!(result.counts.modified, 1);
}

#[test]
fn snapshot_compared_with_itself() {
    let config = Config::default();
    let result = load_and_compare("customers_v1.csv", "customers_v1.csv", &config);

    assert!(!result.has_changes());
    assert_eq!(result.counts.unchanged, 4);
    assert!(result.anomalies.is_empty());
}

#[test]
fn explicit_id_column_by_letter() {
    let config = Config::default().with_id_column("b");
    let result = load_and_compare("customers_v1.csv", "customers_v2.csv", &config);

    assert_eq!(result.old_key.name, "Name");
    assert_eq!(result.old_key.letter, "B");
    assert_eq!(result.old_key.method, ResolutionMethod::Explicit);
    assert_eq!(result.record("Carol").unwrap().status, Classification::Removed);
}

#[test]
fn missing_id_column_falls_back_or_fails() {
    let lenient = Config::default().with_id_column("Account");
    let result = load_and_compare("customers_v1.csv", "customers_v2.csv", &lenient);
    assert_eq!(result.old_key.name, "Customer ID");
    assert!(matches!(
        result.anomalies.first(),
        Some(Anomaly::KeyHintFallback { side: TableSide::Old, .. })
    ));

    let strict = lenient.with_strict_key_resolution(true);
    let old = load("customers_v1.csv", &strict);
    let new = load("customers_v2.csv", &strict);
    let err = compare(&old, &new, &strict).unwrap_err();
    assert!(matches!(err, KeyResolutionError::HintNotFound { .. }));
}

// -------------------------------------------------------------------------
// Mixed formats
// -------------------------------------------------------------------------

#[test]
fn json_against_csv() {
    let config = Config::default();
    let result = load_and_compare("inventory_old.json", "inventory_new.csv", &config);

    assert_eq!(result.old_key.method, ResolutionMethod::NamedId);
    assert_eq!(
        statuses(&result),
        vec![
            ("1".to_string(), Classification::Modified),
            ("2".to_string(), Classification::Unchanged),
            ("3".to_string(), Classification::Added),
        ]
    );
    assert_eq!(result.counts.old_row_count, 4);
    assert_eq!(result.counts.old_keys, 2);

    let widget = result.record("1").unwrap();
    assert_eq!(widget.changes.len(), 1);
    assert_eq!(widget.changes[0].column, "Qty");

    assert_eq!(result.duplicate_keys().count(), 1);
    assert!(result
        .anomalies
        .contains(&Anomaly::EmptyKey { side: TableSide::Old, line: 4 }));
}

#[test]
fn reconcile_with_named_keys() {
    let config = Config::default();
    let old = load("customers_v1.csv", &config);
    let new = load("customers_v2.csv", &config);

    let result = reconcile(&old, "Email", &new, "Email", &config).unwrap();
    assert_eq!(result.old_key.method, ResolutionMethod::Caller);
    // Alice's email changed case, so her record is re-keyed
    assert_eq!(result.counts.added, 2);
    assert_eq!(result.counts.removed, 2);

    let err = reconcile(&old, "Notes", &new, "Notes", &config).unwrap_err();
    assert_eq!(
        err,
        KeyResolutionError::MissingKeyColumn {
            side: TableSide::New,
            column: "Notes".to_string(),
        }
    );
}

#[test]
fn typed_numbers_match_their_text_spelling() {
    // A typed number against the same number stored as text, in columns that also hold text
    let old = Table::from_rows(
        &["ID", "Amount"],
        vec![
            vec![CellValue::Number(1.0), CellValue::Number(100.0)],
            vec!["X-2".into(), "n/a".into()],
        ],
    );
    let new = Table::from_rows(
        &["ID", "Amount"],
        vec![vec!["1".into(), "100".into()], vec!["X-2".into(), "n/a".into()]],
    );

    let result = compare(&old, &new, &Config::default().with_id_column("ID")).unwrap();
    assert_eq!(
        statuses(&result),
        vec![
            ("1".to_string(), Classification::Unchanged),
            ("X-2".to_string(), Classification::Unchanged),
        ]
    );
    assert_eq!(result.counts.added, 0);
    assert_eq!(result.counts.removed, 0);
    assert!(result.record("1").unwrap().changes.is_empty());
}

#[test]
fn zero_padded_text_stays_distinct_from_number() {
    let old = Table::from_rows(
        &["ID", "Name"],
        vec![vec!["007".into(), "Bond".into()], vec!["Q".into(), "Quartermaster".into()]],
    );
    let new = Table::from_rows(
        &["ID", "Name"],
        vec![
            vec![CellValue::Number(7.0), "Bond".into()],
            vec!["Q".into(), "Quartermaster".into()],
        ],
    );

    let result = compare(&old, &new, &Config::default().with_id_column("ID")).unwrap();
    assert_eq!(result.counts.added, 1);
    assert_eq!(result.counts.removed, 1);
    assert_eq!(result.counts.unchanged, 1);
}
