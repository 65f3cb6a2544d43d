use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Name '{0}' already taken")]
    DuplicateName(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Import step '{step}' failed: {reason}")]
    ImportStepFailure { step: String, reason: String },

    #[error("Submission error: {0}")]
    SubmissionError(String),

    #[error("Timed out: {0}")]
    TimedOut(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl ModelError {
    /// Misuse of the API rather than a failure of one unit of work. Callers
    /// that isolate units (import steps, jobs) still propagate these.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::TransactionConflict(_) | Self::InvalidState(_) | Self::LockError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl<T> From<std::sync::PoisonError<T>> for ModelError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
