//! Error types for the analytics engine.
//!
//! Only structural failures live here. Row-level problems (bad dates, missing
//! keys) are recovered during normalization and counted in the
//! [`NormalizationReport`](crate::loader::NormalizationReport); zero-denominator
//! ratios are carried as [`Metric::Undefined`](crate::metric::Metric).

use thiserror::Error;

/// Fatal errors that abort an analysis run before any aggregate is produced.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// One or more expected columns are absent from the input header.
    #[error("Schema error: missing column(s) {}", missing.join(", "))]
    Schema {
        /// Column names that were expected but not found.
        missing: Vec<String>,
    },

    /// Error from the CSV reader or writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error serializing or deserializing JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A bin definition whose edges or labels are malformed.
    #[error("Invalid bin definition: {0}")]
    InvalidBins(String),

    /// A ratio formula refers to a reduction that was never declared.
    #[error("Unknown reduction referenced: {0}")]
    UnknownReduction(String),

    /// A selection asked for a column the result does not carry.
    #[error("Unknown result column: {0}")]
    UnknownColumn(String),

    /// Two reductions or ratios share an output column name.
    #[error("Duplicate output column: {0}")]
    DuplicateColumn(String),

    /// Filter parameters that cannot describe any record set.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_columns() {
        let err = AnalyticsError::Schema {
            missing: vec!["Order Date".to_string(), "Postal Code".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Schema error: missing column(s) Order Date, Postal Code"
        );
    }

    #[test]
    fn test_unknown_reduction_display() {
        let err = AnalyticsError::UnknownReduction("Total_Sales".to_string());
        assert_eq!(err.to_string(), "Unknown reduction referenced: Total_Sales");
    }
}
