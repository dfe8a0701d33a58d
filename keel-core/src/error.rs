use thiserror::Error;

/// Failure taxonomy of the data access layer.
///
/// Nothing is retried or silently downgraded inside the core; every error
/// propagates to the caller with enough context (operation, table, column) to
/// diagnose without re-running under tracing.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A referenced table, view, column or routine cannot be resolved against
    /// cached or live metadata.
    #[error("{operation}: database object \"{name}\" was not found")]
    MissingObject {
        operation: &'static str,
        name: String,
    },

    /// A value or column cannot be mapped to the requested host type, or a
    /// result set is missing a column the target type requires.
    #[error("mapping error: {message}")]
    Mapping { message: String },

    /// A single-row materializer found zero rows under a policy that forbids it.
    #[error("{operation} on \"{target}\" returned no rows")]
    MissingData {
        operation: &'static str,
        target: String,
    },

    /// A single-row materializer found more than one row under a policy that
    /// forbids it.
    #[error("{operation} on \"{target}\" returned {rows} rows, expected one")]
    UnexpectedData {
        operation: &'static str,
        target: String,
        rows: usize,
    },

    /// Invalid configuration detected when the command was prepared.
    #[error("invalid command: {message}")]
    Validation { message: String },

    /// A modify command affected a different number of rows than expected.
    #[error("{operation} on \"{target}\" affected {actual} rows, expected {expected}")]
    RowCountMismatch {
        operation: &'static str,
        target: String,
        expected: u64,
        actual: u64,
    },

    /// The backend execution adapter reported a failure.
    #[error("{operation} on \"{target}\" failed: {message}")]
    Execution {
        operation: &'static str,
        target: String,
        message: String,
    },

    /// The asynchronous execution was abandoned because cancellation was
    /// requested while the command was in flight.
    #[error("{operation} on \"{target}\" was canceled")]
    Canceled {
        operation: &'static str,
        target: String,
    },
}

impl ChainError {
    pub fn mapping(message: impl Into<String>) -> Self {
        ChainError::Mapping {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ChainError::Validation {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
pub type Error = ChainError;
