use serde::{Deserialize, Serialize};

/// Stable classification of every error the alerting core can return.
///
/// Callers match on the kind, not on the message; messages are for humans.
///
/// # Examples
///
/// ```
/// use dashalert_common::error::ErrorKind;
///
/// assert_eq!(ErrorKind::PermissionDenied.to_string(), "permission_denied");
/// assert!(ErrorKind::Storage.is_retryable());
/// assert!(!ErrorKind::Conflict.is_retryable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PermissionDenied,
    Invalid,
    Storage,
    Cancelled,
}

impl ErrorKind {
    /// Only transient storage failures are worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Storage)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Storage => "storage",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
