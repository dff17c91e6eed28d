//! Application error types

use api_proto::{ErrorKind, ErrorResponse};
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Client errors (rejected before or during the operation) =====
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("File too large: {name} exceeds the {limit} byte limit")]
    TooLarge { name: String, limit: u64 },

    // ===== Server-side failures =====
    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Initialization failed: {0}")]
    Init(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Wire classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidPath(_) => ErrorKind::InvalidPath,
            AppError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            AppError::AccessDenied(_) => ErrorKind::AccessDenied,
            AppError::TooLarge { .. } => ErrorKind::TooLarge,
            AppError::MetadataUnavailable(_) => ErrorKind::MetadataUnavailable,
            AppError::Io(_) | AppError::Init(_) | AppError::Internal(_) => ErrorKind::Unknown,
        }
    }

    /// Is this the caller's fault?
    pub fn is_client_error(&self) -> bool {
        self.kind().status_code() < 500
    }

    /// Get a user-friendly message
    ///
    /// Server-side failures collapse to a generic text; details go to the log.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidPath(msg) => format!("Invalid path: {}", msg),
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::NotFound(path) => format!("Not found: {}", path),
            AppError::AlreadyExists(path) => format!("{} already exists", path),
            AppError::AccessDenied(path) => format!("Access denied: {}", path),
            AppError::TooLarge { name, limit } => {
                format!("{} exceeds the maximum upload size of {} bytes", name, limit)
            }
            AppError::MetadataUnavailable(_) => "File metadata could not be read".to_string(),
            _ => "The operation failed".to_string(),
        }
    }

    /// Failure body for the wire
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.kind(), self.user_message())
    }
}

impl From<app_fs::FsError> for AppError {
    fn from(e: app_fs::FsError) -> Self {
        match e {
            app_fs::FsError::InvalidPath(msg) => AppError::InvalidPath(msg),
            app_fs::FsError::NotFound(p) => AppError::NotFound(p),
            app_fs::FsError::AlreadyExists(p) => AppError::AlreadyExists(p),
            app_fs::FsError::AccessDenied(p) => AppError::AccessDenied(p),
            app_fs::FsError::TooLarge { name, limit } => AppError::TooLarge { name, limit },
            app_fs::FsError::MetadataUnavailable(msg) => AppError::MetadataUnavailable(msg),
            app_fs::FsError::Io(e) => AppError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_errors_keep_their_kind() {
        let cases = [
            (app_fs::FsError::InvalidPath("..".into()), ErrorKind::InvalidPath),
            (app_fs::FsError::NotFound("a".into()), ErrorKind::NotFound),
            (app_fs::FsError::AlreadyExists("a".into()), ErrorKind::AlreadyExists),
            (app_fs::FsError::AccessDenied("a".into()), ErrorKind::AccessDenied),
            (
                app_fs::FsError::TooLarge {
                    name: "a".into(),
                    limit: 1,
                },
                ErrorKind::TooLarge,
            ),
            (
                app_fs::FsError::Io(std::io::Error::other("disk on fire")),
                ErrorKind::Unknown,
            ),
        ];

        for (fs_error, kind) in cases {
            assert_eq!(AppError::from(fs_error).kind(), kind);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::Io(std::io::Error::other("/srv/secret/path: EIO"));
        let response = err.to_response();
        assert_eq!(response.kind, ErrorKind::Unknown);
        assert!(!response.error.contains("secret"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_already_exists_message() {
        let err = AppError::AlreadyExists("docs/foo".into());
        assert_eq!(err.user_message(), "docs/foo already exists");
        assert!(err.is_client_error());
        assert_eq!(err.kind().status_code(), 400);
    }
}
