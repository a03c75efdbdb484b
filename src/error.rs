//! Error types for cohort analysis
//!
//! Failures that callers may want to match on are typed here. Everything
//! else (I/O, polars, plotters) flows through `anyhow` with context.

use thiserror::Error;

/// Errors raised while cleaning or configuring a cohort analysis
#[derive(Error, Debug, PartialEq)]
pub enum CohortError {
    /// A required column is absent from the CSV header
    #[error("Required column '{0}' not found in input")]
    MissingColumn(String),

    /// A `created_date` value could not be parsed as a timestamp
    #[error("Unparsable created_date at row {row}: '{value}'")]
    UnparsableCreatedDate {
        /// Zero-based row index after duplicate removal
        row: usize,
        /// The raw cell value
        value: String,
    },

    /// A command-line parameter is out of range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}
