//! Error types shared by the classifier, the stores and the monitor loop.

use thiserror::Error;

/// Failures raised by a block-list, guidance or report store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("corrupt store row: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        let unavailable = matches!(
            &e,
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::DatabaseBusy
                        | rusqlite::ErrorCode::DatabaseLocked
                )
        );
        if unavailable {
            return StoreError::Unavailable(e.to_string());
        }
        match e {
            rusqlite::Error::FromSqlConversionFailure(..) => StoreError::Corrupt(e.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Failures raised by the host activity source while polling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivityError {
    /// The host revoked the usage-access permission. The monitor stops.
    #[error("activity permission revoked")]
    PermissionRevoked,

    #[error("activity query failed: {0}")]
    Query(String),
}

/// Closed taxonomy of detection failures handled by the recovery coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionErrorKind {
    #[error("detection model unavailable")]
    ModelUnavailable,

    #[error("processing timed out")]
    ProcessingTimeout,

    #[error("insufficient memory")]
    InsufficientMemory,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("classification error: {0}")]
    ClassificationError(String),

    #[error("enforcement error: {0}")]
    EnforcementError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl DetectionErrorKind {
    /// Short stable label, used as a structured log field.
    pub fn label(&self) -> &'static str {
        match self {
            DetectionErrorKind::ModelUnavailable => "model_unavailable",
            DetectionErrorKind::ProcessingTimeout => "processing_timeout",
            DetectionErrorKind::InsufficientMemory => "insufficient_memory",
            DetectionErrorKind::NetworkError(_) => "network_error",
            DetectionErrorKind::StorageError(_) => "storage_error",
            DetectionErrorKind::ClassificationError(_) => "classification_error",
            DetectionErrorKind::EnforcementError(_) => "enforcement_error",
            DetectionErrorKind::Unknown(_) => "unknown",
        }
    }
}

impl From<&StoreError> for DetectionErrorKind {
    fn from(e: &StoreError) -> Self {
        DetectionErrorKind::StorageError(e.to_string())
    }
}

impl From<&ActivityError> for DetectionErrorKind {
    fn from(e: &ActivityError) -> Self {
        match e {
            ActivityError::PermissionRevoked => {
                DetectionErrorKind::EnforcementError(e.to_string())
            }
            ActivityError::Query(detail) => DetectionErrorKind::Unknown(detail.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_maps_to_storage_kind() {
        let err = StoreError::Query("no such table: site_entries".into());
        let kind = DetectionErrorKind::from(&err);
        assert_eq!(
            kind,
            DetectionErrorKind::StorageError(
                "store query failed: no such table: site_entries".into()
            )
        );
        assert_eq!(kind.label(), "storage_error");
    }

    #[test]
    fn test_sqlite_busy_is_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(StoreError::from(err), StoreError::Unavailable(_)));
    }
}
