use std::fmt;

/// The engine's error taxonomy. Variants are kinds, not wrapped foreign
/// types: every fallible operation across the workspace eventually resolves
/// to one of these, so callers can match on `kind()` without downcasting.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("schema `{schema}` does not exist")]
    SchemaNotExist { schema: String },

    #[error("table `{schema}`.`{table}` does not exist")]
    TableNotExist { schema: String, table: String },

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("checksum mismatch for migration directory")]
    ChecksumMismatch,

    #[error("checksum file is malformed: {0}")]
    ChecksumFormat(String),

    #[error("no checksum file found, but migration files are present")]
    ChecksumNotFound,

    #[error("no checkpoint named `{0}` in the migration directory")]
    CheckpointNotFound(String),

    #[error("{comment}: {source}", comment = .comment.as_deref().unwrap_or("database error"))]
    Driver {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        comment: Option<String>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("could not acquire advisory lock `{0}`; another host may be migrating")]
    AdvisoryLockUnavailable(u64),
}

impl ConnectorError {
    pub fn kind(&self) -> ConnectorErrorKind {
        match self {
            ConnectorError::SchemaNotExist { .. } | ConnectorError::TableNotExist { .. } => {
                ConnectorErrorKind::NotExist
            }
            ConnectorError::UnsupportedType(_) => ConnectorErrorKind::UnsupportedType,
            ConnectorError::UnsupportedOperation(_) => ConnectorErrorKind::UnsupportedOperation,
            ConnectorError::ChecksumMismatch => ConnectorErrorKind::ChecksumMismatch,
            ConnectorError::ChecksumFormat(_) => ConnectorErrorKind::ChecksumFormat,
            ConnectorError::ChecksumNotFound => ConnectorErrorKind::ChecksumNotFound,
            ConnectorError::CheckpointNotFound(_) => ConnectorErrorKind::CheckpointNotFound,
            ConnectorError::Driver { .. } => ConnectorErrorKind::Driver,
            ConnectorError::Cancelled => ConnectorErrorKind::Cancellation,
            ConnectorError::AdvisoryLockUnavailable(_) => ConnectorErrorKind::AdvisoryLockUnavailable,
        }
    }

    /// Whether a caller should retry the whole operation rather than treat
    /// it as a hard failure — only the advisory-lock contention case (§5
    /// "Acquisition is best-effort; failure to acquire yields a retriable
    /// error").
    pub fn is_retriable(&self) -> bool {
        matches!(self, ConnectorError::AdvisoryLockUnavailable(_))
    }

    /// Prefixes a statement's comment onto a driver error, the way Apply
    /// contract ("the statement's comment, if any, is prefixed to the
    /// returned error message").
    pub fn driver(
        source: impl std::error::Error + Send + Sync + 'static,
        comment: Option<String>,
    ) -> Self {
        ConnectorError::Driver {
            source: Box::new(source),
            comment,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, ConnectorError::Cancelled)
    }
}

/// The coarse-grained classification exposed so callers can
/// branch without matching every variant (e.g. "was this retriable?").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorErrorKind {
    NotExist,
    UnsupportedType,
    UnsupportedOperation,
    ChecksumMismatch,
    ChecksumFormat,
    ChecksumNotFound,
    CheckpointNotFound,
    Driver,
    Cancellation,
    AdvisoryLockUnavailable,
}

impl fmt::Display for ConnectorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorErrorKind::NotExist => "not-exist",
            ConnectorErrorKind::UnsupportedType => "unsupported-type",
            ConnectorErrorKind::UnsupportedOperation => "unsupported-operation",
            ConnectorErrorKind::ChecksumMismatch => "checksum-mismatch",
            ConnectorErrorKind::ChecksumFormat => "checksum-format",
            ConnectorErrorKind::ChecksumNotFound => "checksum-not-found",
            ConnectorErrorKind::CheckpointNotFound => "checkpoint-not-found",
            ConnectorErrorKind::Driver => "driver",
            ConnectorErrorKind::Cancellation => "cancellation",
            ConnectorErrorKind::AdvisoryLockUnavailable => "advisory-lock-unavailable",
        };
        f.write_str(s)
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_exist_errors_classify_correctly() {
        let err = ConnectorError::TableNotExist {
            schema: "public".into(),
            table: "users".into(),
        };
        assert_eq!(err.kind(), ConnectorErrorKind::NotExist);
    }

    #[test]
    fn advisory_lock_unavailable_is_retriable_and_others_are_not() {
        assert!(ConnectorError::AdvisoryLockUnavailable(42).is_retriable());
        assert!(!ConnectorError::ChecksumMismatch.is_retriable());
    }

    #[test]
    fn driver_error_carries_comment() {
        let io_err = std::io::Error::other("boom");
        let err = ConnectorError::driver(io_err, Some("-- create users table".into()));
        let message = err.to_string();
        assert!(message.contains("create users table"));
        assert!(message.contains("boom"));
    }
}
