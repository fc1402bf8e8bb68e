//! Unified error type for the flexibility toolkit.
//!
//! Every library crate reports failures through [`FlexError`]. Orchestration
//! layers (table readers, the batch runner, the CLI) wrap it in
//! `anyhow::Error` with context and can recover the typed variant via
//! `downcast_ref::<FlexError>()`.
//!
//! # Example
//!
//! ```ignore
//! use flex_core::{FlexError, FlexResult};
//!
//! fn require_column(columns: &[&str], name: &str) -> FlexResult<()> {
//!     if columns.contains(&name) {
//!         Ok(())
//!     } else {
//!         Err(FlexError::MissingColumn { column: name.to_string() })
//!     }
//! }
//! ```

use thiserror::Error;

/// Unified error type for all toolkit operations.
///
/// Input validation variants (`MissingColumn`, `InvalidTimestamp`,
/// `NonMonotonic`, `InvalidDemand`, `EmptySeries`) are fatal for the
/// substation being processed; the batch runner records them and moves on.
#[derive(Error, Debug)]
pub enum FlexError {
    /// I/O errors (file access, directory creation)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// A required column is absent from the input table
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    /// A timestamp cell could not be parsed
    #[error("invalid timestamp '{value}' at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    /// Timestamps went backwards
    #[error("timestamps are not monotonic at row {row}: {current} precedes {previous}")]
    NonMonotonic {
        row: usize,
        previous: String,
        current: String,
    },

    /// A demand cell is missing or not a finite number
    #[error("invalid demand value at row {row}: {reason}")]
    InvalidDemand { row: usize, reason: String },

    /// The series holds no samples
    #[error("demand series is empty")]
    EmptySeries,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl FlexError {
    /// True for the variants that describe malformed demand input.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            FlexError::MissingColumn { .. }
                | FlexError::InvalidTimestamp { .. }
                | FlexError::NonMonotonic { .. }
                | FlexError::InvalidDemand { .. }
                | FlexError::EmptySeries
        )
    }
}

/// Convenience type alias for Results using FlexError.
pub type FlexResult<T> = Result<T, FlexError>;

impl From<anyhow::Error> for FlexError {
    fn from(err: anyhow::Error) -> Self {
        FlexError::Other(err.to_string())
    }
}

impl From<String> for FlexError {
    fn from(s: String) -> Self {
        FlexError::Other(s)
    }
}

impl From<&str> for FlexError {
    fn from(s: &str) -> Self {
        FlexError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for FlexError {
    fn from(err: serde_json::Error) -> Self {
        FlexError::Parse(err.to_string())
    }
}
