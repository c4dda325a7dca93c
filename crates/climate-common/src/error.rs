//! Error types for request validation.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias using ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A request was malformed or names something the dataset does not have.
///
/// Validation errors are raised before any network attempt and are never
/// cached or retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // === Catalogue Errors ===
    #[error("Invalid {param} '{value}'. Valid: {valid}")]
    InvalidParameter {
        param: &'static str,
        value: String,
        valid: String,
    },

    // === Date Errors ===
    #[error("Invalid date format '{0}'. Expected: 'YYYY-MM-DD'")]
    InvalidDate(String),

    #[error("Date {0} is before the dataset epoch 1950-01-01")]
    DateBeforeEpoch(NaiveDate),

    #[error("Date year {year} out of range for '{scenario}'. Valid: {start_year}-{end_year}")]
    DateOutOfRange {
        year: i32,
        scenario: String,
        start_year: i32,
        end_year: i32,
    },

    #[error("For date {date} (before {switch_year}), only 'historical' is available. Got '{scenario}'.")]
    ScenarioNotAvailable {
        date: NaiveDate,
        scenario: String,
        switch_year: i32,
    },

    // === Request Shape Errors ===
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ValidationError {
    /// Build an InvalidParameter error listing the accepted values.
    pub fn invalid_parameter(param: &'static str, value: impl Into<String>, valid: &[&str]) -> Self {
        Self::InvalidParameter {
            param,
            value: value.into(),
            valid: valid.join(", "),
        }
    }

    /// Build an InvalidRequest error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}
