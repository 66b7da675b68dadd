//! Error types for key resolution.
//!
//! Only failing to find an identifier column aborts a comparison. Everything
//! else is reported as an [`Anomaly`](crate::diff::Anomaly) inside the result.

use thiserror::Error;

use crate::model::TableSide;

/// No usable identifier column could be determined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyResolutionError {
    /// The table has no columns at all
    #[error("{side} table has no columns to use as identifier")]
    NoColumns { side: TableSide },

    /// Explicit hint did not match any column and strict resolution is enabled
    #[error("identifier column '{hint}' not found in {side} table (available: {available})")]
    HintNotFound {
        side: TableSide,
        hint: String,
        available: String,
    },

    /// A key column handed to the reconciler does not exist in its table
    #[error("key column '{column}' does not exist in {side} table")]
    MissingKeyColumn { side: TableSide, column: String },
}

/// Convenience type alias for key resolution results
pub type Result<T> = std::result::Result<T, KeyResolutionError>;
