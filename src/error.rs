//! Contest error taxonomy
//!
//! Every failure a caller can see is one of these. Phase and input checks
//! run before any write; only `Storage` and `StoreUnavailable` come from the
//! store itself.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContestError {
    #[error("Submissions are closed!")]
    SubmissionClosed,

    #[error("Voting is closed!")]
    VotingClosed,

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Entry {0} not found")]
    EntryNotFound(i64),

    #[error("Reset is disabled")]
    ResetDisabled,

    #[error("Upload too large (limit is {limit} bytes)")]
    UploadTooLarge { limit: usize },

    #[error("Database error")]
    Storage(#[from] anyhow::Error),

    #[error("Database unavailable")]
    StoreUnavailable,
}

/// Coarse grouping used for status codes and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PhaseClosed,
    Validation,
    NotFound,
    Forbidden,
    TooLarge,
    Storage,
}

impl ContestError {
    pub fn validation(field: &str, message: &str) -> Self {
        ContestError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ContestError::SubmissionClosed | ContestError::VotingClosed => ErrorKind::PhaseClosed,
            ContestError::Validation { .. } | ContestError::InvalidCategory(_) => ErrorKind::Validation,
            ContestError::EntryNotFound(_) => ErrorKind::NotFound,
            ContestError::ResetDisabled => ErrorKind::Forbidden,
            ContestError::UploadTooLarge { .. } => ErrorKind::TooLarge,
            ContestError::Storage(_) | ContestError::StoreUnavailable => ErrorKind::Storage,
        }
    }
}

pub type ContestResult<T> = Result<T, ContestError>;

#[cfg(feature = "server")]
mod http {
    use super::{ContestError, ErrorKind};
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    };
    use serde_json::json;

    impl ContestError {
        pub fn status_code(&self) -> StatusCode {
            match self.kind() {
                ErrorKind::PhaseClosed | ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for ContestError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            let body = Json(json!({
                "success": false,
                "error": self.to_string(),
            }));

            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ContestError::SubmissionClosed.kind(), ErrorKind::PhaseClosed);
        assert_eq!(ContestError::VotingClosed.kind(), ErrorKind::PhaseClosed);
        assert_eq!(ContestError::InvalidCategory("Spookiest".into()).kind(), ErrorKind::Validation);
        assert_eq!(ContestError::validation("name", "is required").kind(), ErrorKind::Validation);
        assert_eq!(ContestError::EntryNotFound(7).kind(), ErrorKind::NotFound);
        assert_eq!(ContestError::ResetDisabled.kind(), ErrorKind::Forbidden);
        assert_eq!(ContestError::UploadTooLarge { limit: 1024 }.kind(), ErrorKind::TooLarge);
        assert_eq!(
            ContestError::from(anyhow::anyhow!("disk full")).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ContestError::validation("costumeName", "is required").to_string(),
            "Invalid costumeName: is required"
        );
        assert_eq!(
            ContestError::InvalidCategory("Spookiest".into()).to_string(),
            "Invalid category: Spookiest"
        );
        assert_eq!(
            ContestError::UploadTooLarge { limit: 1024 }.to_string(),
            "Upload too large (limit is 1024 bytes)"
        );
        // storage details stay in the logs, not in responses
        assert_eq!(ContestError::from(anyhow::anyhow!("disk full")).to_string(), "Database error");
    }

    #[cfg(feature = "server")]
    #[test]
    fn test_status_codes() {
        use axum::http::StatusCode;

        assert_eq!(ContestError::VotingClosed.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ContestError::ResetDisabled.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ContestError::InvalidCategory("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ContestError::EntryNotFound(1).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ContestError::UploadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ContestError::from(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ContestError::StoreUnavailable.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
