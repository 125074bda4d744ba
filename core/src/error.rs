use std::fmt;

use thiserror::Error;

/// Why a user-supplied weight or height was rejected.
///
/// These are advisory checks: callers surface the message to the user and ask
/// again, they never abort on them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Please enter a valid number")]
    InvalidNumber,

    #[error("{what} must be between {min} and {max} {unit} (got {value})")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
        unit: &'static str,
    },
}

/// Where in an import file a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLocation {
    /// 1-based line number in a CSV file.
    Line(usize),
    /// 1-based position in a JSON record array.
    Record(usize),
}

impl fmt::Display for RowLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowLocation::Line(n) => write!(f, "Line {n}"),
            RowLocation::Record(n) => write!(f, "Record {n}"),
        }
    }
}

/// A malformed import row. Collected into `ImportResult.errors`, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {message}")]
pub struct RowError {
    pub location: RowLocation,
    pub message: String,
}

impl RowError {
    pub fn new(location: RowLocation, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}
