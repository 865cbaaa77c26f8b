//! Error types for the interrogation engine.
//!
//! All fallible operations return [`TermError`]. Configuration and I/O errors
//! are fatal and surface to the caller; errors raised while evaluating a
//! single atomic step are captured into that step's result instead.

use thiserror::Error;

/// The main error type for the interrogation engine.
#[derive(Error, Debug)]
pub enum TermError {
    /// Error that occurs when a check fails to evaluate.
    #[error("Constraint evaluation failed for '{constraint}': {message}")]
    ConstraintEvaluation {
        /// Name of the check that failed
        constraint: String,
        /// Detailed error message
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "Parquet", "Memory")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error related to plan or threshold configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error when a required column is not found in the table.
    #[error("Column '{column}' not found in table")]
    ColumnNotFound { column: String },

    /// The interrogation did not finish within its time budget.
    #[error("Interrogation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),
}

/// A type alias for `Result<T, TermError>`.
pub type Result<T> = std::result::Result<T, TermError>;

impl TermError {
    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new constraint evaluation error.
    pub fn constraint_evaluation(
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ConstraintEvaluation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true for errors that must abort an interrogation rather than
    /// being recorded against a single step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TermError::Configuration(_)
                | TermError::Io(_)
                | TermError::DataSource { .. }
                | TermError::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for TermError {
    fn from(err: serde_json::Error) -> Self {
        TermError::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<TermError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| wrap(msg, e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(&f(), e.into()))
    }
}

// Fatal kinds keep their variant so callers can still branch on them.
fn wrap(msg: &str, err: TermError) -> TermError {
    match err {
        TermError::Internal(inner) => TermError::Internal(format!("{msg}: {inner}")),
        TermError::Configuration(inner) => TermError::Configuration(format!("{msg}: {inner}")),
        TermError::Io(inner) => {
            TermError::Io(std::io::Error::new(inner.kind(), format!("{msg}: {inner}")))
        }
        other => TermError::Internal(format!("{msg}: {other}")),
    }
}
