//! Canonical forms for cell comparison.
//!
//! Two cells are equal iff their normalized values are equal. The same
//! relation drives key matching and field change detection.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::config::Config;
use crate::model::CellValue;

/// Error literals spreadsheets write into cells that failed to compute
const SPREADSHEET_ERRORS: &[&str] = &[
    "#DIV/0!", "#N/A", "#VALUE!", "#REF!", "#NAME?", "#NUM!", "#NULL!",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Why a cell fell back to its textual form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
    /// The cell holds a spreadsheet error literal such as `#DIV/0!`
    SpreadsheetError,
    /// A number that is NaN or infinite
    NonFiniteNumber,
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradeReason::SpreadsheetError => write!(f, "spreadsheet error value"),
            DegradeReason::NonFiniteNumber => write!(f, "non-finite number"),
        }
    }
}

/// Cell normalizer with configurable options
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    case_sensitive: bool,
}

impl Normalizer {
    /// Create a normalizer for the given configuration
    pub fn new(config: &Config) -> Self {
        Self {
            case_sensitive: config.case_sensitive,
        }
    }

    /// Canonical form of a cell.
    ///
    /// `numeric` says whether the column is number-like, in which case numeric
    /// text compares equal to the number it spells. Outside such columns
    /// numbers take their displayed text form.
    pub fn normalize(&self, value: &CellValue, numeric: bool) -> CellValue {
        self.normalize_checked(value, numeric).0
    }

    /// Canonical form of a cell plus the reason it degraded to text, if it did
    pub fn normalize_checked(
        &self,
        value: &CellValue,
        numeric: bool,
    ) -> (CellValue, Option<DegradeReason>) {
        match value {
            CellValue::Empty => (CellValue::Empty, None),
            CellValue::Boolean(b) => (CellValue::Boolean(*b), None),
            CellValue::Number(f) => {
                if f.is_finite() {
                    // Fold -0.0 into 0.0
                    let n = CellValue::Number(*f + 0.0);
                    if numeric {
                        (n, None)
                    } else {
                        // Match text that spells the same number
                        (self.fold_text(&n.display()), None)
                    }
                } else {
                    (
                        self.fold_text(&f.to_string()),
                        Some(DegradeReason::NonFiniteNumber),
                    )
                }
            }
            CellValue::Temporal(dt) => (CellValue::Temporal(*dt), None),
            CellValue::Text(s) => self.normalize_text(s, numeric),
        }
    }

    fn normalize_text(&self, s: &str, numeric: bool) -> (CellValue, Option<DegradeReason>) {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return (CellValue::Empty, None);
        }

        if SPREADSHEET_ERRORS
            .iter()
            .any(|e| e.eq_ignore_ascii_case(trimmed))
        {
            return (
                self.fold_text(trimmed),
                Some(DegradeReason::SpreadsheetError),
            );
        }

        if numeric {
            if let Some(n) = parse_number(trimmed) {
                return (CellValue::Number(n + 0.0), None);
            }
        }

        if let Some(dt) = parse_temporal(trimmed) {
            return (CellValue::Temporal(dt), None);
        }

        (self.fold_text(trimmed), None)
    }

    fn fold_text(&self, s: &str) -> CellValue {
        if self.case_sensitive {
            CellValue::Text(s.to_string())
        } else {
            CellValue::Text(s.to_lowercase())
        }
    }

    /// Compare two cells under this normalizer
    pub fn equal(&self, a: &CellValue, b: &CellValue, numeric: bool) -> bool {
        self.normalize(a, numeric) == self.normalize(b, numeric)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Parse finite numeric text
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse date and date-time text into a single instant representation.
///
/// Offsets are converted to UTC; bare dates map to midnight.
pub fn parse_temporal(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Whether a single value could take part in numeric comparison
pub fn is_number_like(value: &CellValue) -> bool {
    match value {
        CellValue::Number(f) => f.is_finite(),
        CellValue::Text(s) => parse_number(s.trim()).is_some(),
        _ => false,
    }
}

/// A column is number-like when every non-empty value in it is number-like
/// and there is at least one such value.
pub fn column_is_numeric<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> bool {
    let mut seen = false;
    for value in values {
        if is_blank(value) {
            continue;
        }
        if !is_number_like(value) {
            return false;
        }
        seen = true;
    }
    seen
}

/// Empty or whitespace-only
pub fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Empty => true,
        CellValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Textual form used in reports and anomaly messages
pub fn display_text(value: &CellValue) -> String {
    value.display().trim().to_string()
}
