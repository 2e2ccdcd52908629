//! Error types for the statistical decision engine.
//!
//! Errors fall into two families:
//!
//! - **User-input errors** (wrong group count, non-numeric columns, too few
//!   observations, nothing left after filtering nulls). These are expected
//!   mistakes and are turned into a displayable report by
//!   [`AnalysisOutcome`](crate::reporting::AnalysisOutcome).
//! - **Unexpected failures** (numerical breakdowns, polars errors, I/O). These
//!   propagate to the caller, which decides how to present them.
//!
//! Errors are serializable so a frontend can receive `{code, message}` pairs.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the statistics engine.
#[derive(Error, Debug)]
pub enum StatsError {
    /// Sample size is below the minimum a procedure needs.
    #[error("Insufficient sample for {context}: need at least {required}, got {actual}")]
    InsufficientSample {
        context: String,
        required: usize,
        actual: usize,
    },

    /// Grouping variable has the wrong number of distinct values.
    #[error(
        "Grouping column '{column}' must contain {expected} groups, found {found}: [{}]",
        .groups.join(", ")
    )]
    InvalidGroupCount {
        column: String,
        expected: String,
        found: usize,
        groups: Vec<String>,
    },

    /// A numeric-only procedure was given non-numeric input.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// No usable rows or columns remain after filtering.
    #[error("No usable data: {0}")]
    EmptyInput(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Numerical or linear-algebra failure.
    #[error("Numerical failure: {0}")]
    Numerical(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<StatsError>,
    },
}

impl StatsError {
    /// Shorthand for [`StatsError::InsufficientSample`].
    pub fn insufficient(context: impl Into<String>, required: usize, actual: usize) -> Self {
        StatsError::InsufficientSample {
            context: context.into(),
            required,
            actual,
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        StatsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientSample { .. } => "INSUFFICIENT_SAMPLE",
            Self::InvalidGroupCount { .. } => "INVALID_GROUP_COUNT",
            Self::TypeMismatch(_) => "TYPE_MISMATCH",
            Self::EmptyInput(_) => "EMPTY_INPUT",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Numerical(_) => "NUMERICAL_FAILURE",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error is an expected user-input mistake that should be
    /// shown as a report rather than raised.
    pub fn is_user_input(&self) -> bool {
        match self {
            Self::InsufficientSample { .. }
            | Self::InvalidGroupCount { .. }
            | Self::TypeMismatch(_)
            | Self::EmptyInput(_)
            | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_user_input(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for StatsError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("StatsError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| StatsError::Polars(e).with_context(context))
    }
}
