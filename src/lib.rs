//! keydiff - Identifier-based diff for spreadsheet snapshots
//!
//! Compares two versions of a table (CSV, Excel, JSON) by matching rows on an
//! identifier column rather than by position, and classifies every record as
//! added, removed, modified or unchanged.

pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod resolve;

pub use config::Config;
pub use diff::{compare, reconcile, Classification, ComparisonResult};
pub use error::KeyResolutionError;
pub use model::{CellValue, Table};
