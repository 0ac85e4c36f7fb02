//! Error taxonomy shared across the workspace.
//!
//! Row-store failures are fatal to the operation that caused them; calendar
//! failures during best-effort sync are degraded to logs by the orchestrator
//! and reported through `SyncStatus` instead of this type.

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum CallsheetError {
    /// Malformed input, rejected before any write reaches the row store.
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },

    /// An id was absent in the row store on update/delete.
    #[error("not found: {0}")]
    NotFound(String),

    /// A row-store or calendar call failed (network, auth, quota).
    #[error("{service} error: {message}")]
    External { service: String, message: String },

    /// A structured spreadsheet cell could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The deterministic event id for one task is already claimed by another.
    #[error("event id collision: task {task_id} maps onto event {event_id} owned by a different task")]
    Collision { task_id: String, event_id: String },
}

impl CallsheetError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::External {
            service: service.into(),
            message: message.into(),
        }
    }

    /// True for errors a caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CallsheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_the_field() {
        let err = CallsheetError::validation("scheduled_time", "expected HH:MM");
        assert_eq!(
            err.to_string(),
            "validation failed for `scheduled_time`: expected HH:MM"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn external_error_names_the_service() {
        let err = CallsheetError::external("calendar", "quota exceeded");
        assert_eq!(err.to_string(), "calendar error: quota exceeded");
        assert!(!err.is_client_error());
    }

    #[test]
    fn not_found_is_distinct_from_validation() {
        let err = CallsheetError::NotFound("T42".to_string());
        assert_eq!(err.to_string(), "not found: T42");
        assert!(err.is_client_error());
    }
}
