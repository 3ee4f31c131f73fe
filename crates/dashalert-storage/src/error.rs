use dashalert_common::error::ErrorKind;
use sea_orm::{DbErr, SqlErr};

/// Errors returned by the alert repository.
///
/// Every variant maps onto a stable [`ErrorKind`]; only
/// [`AlertError::Storage`] is worth retrying.
///
/// # Examples
///
/// ```rust
/// use dashalert_common::error::ErrorKind;
/// use dashalert_storage::error::AlertError;
///
/// let err = AlertError::not_found("alert", 99);
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert!(err.to_string().contains("alert"));
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// A referenced alert, dashboard or user does not exist.
    #[error("Alert: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// The change clashes with current state: a paused alert, or a duplicate key.
    #[error("Alert: conflict: {0}")]
    Conflict(String),

    /// The caller may not read rules of the requested organization.
    #[error("Alert: permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed input.
    #[error("Alert: invalid input: {0}")]
    Invalid(String),

    /// Transient failure of the underlying database.
    #[error("Alert: storage error: {0}")]
    Storage(#[from] DbErr),

    /// The cancellation token fired before the transaction committed.
    #[error("Alert: operation cancelled before commit")]
    Cancelled,
}

impl AlertError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AlertError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AlertError::NotFound { .. } => ErrorKind::NotFound,
            AlertError::Conflict(_) => ErrorKind::Conflict,
            AlertError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AlertError::Invalid(_) => ErrorKind::Invalid,
            AlertError::Storage(_) => ErrorKind::Storage,
            AlertError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Maps a write failure, turning unique-index violations into [`AlertError::Conflict`].
pub(crate) fn map_write_err(err: DbErr, conflict: impl FnOnce() -> String) -> AlertError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AlertError::Conflict(conflict()),
        _ => AlertError::Storage(err),
    }
}

/// Convenience `Result` alias for repository operations.
pub type Result<T> = std::result::Result<T, AlertError>;
