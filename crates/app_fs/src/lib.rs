//! Storage-root file system layer
//!
//! Provides the file manager's view of a single storage directory:
//! - CanonicalPath / PathResolver: traversal-free, root-relative addressing
//! - Breadcrumbs and parent derivation
//! - Directory browsing with hidden-file policy
//! - Create / delete primitives
//! - Size-limited upload staging

mod canonical_path;
mod sanitize;
mod breadcrumb;
mod content_type;
mod browser;
mod file_operations;
mod upload;

pub use canonical_path::{CanonicalPath, PathResolver, SEPARATOR};
pub use sanitize::{validate_segment, MAX_SEGMENT_LEN};
pub use breadcrumb::{build_breadcrumbs, parent_of, Breadcrumb, ROOT_LABEL};
pub use content_type::{detect_content_type, OCTET_STREAM};
pub use browser::{
    list_directory, read_file_entry, DirectoryEntry, DirectoryListing, FileEntry, HiddenFiles,
    ListOptions,
};
pub use file_operations::{create_dir, delete_dir, delete_file};
pub use upload::{is_staging_name, remove_stale_staging, StagedUpload, STAGING_PREFIX};

use std::io;
use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("File too large: {name} exceeds {limit} bytes")]
    TooLarge { name: String, limit: u64 },

    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),
}

impl FsError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(err: io::Error, path: &str) -> Self {
        let shown = if path.is_empty() { "/" } else { path };
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(shown.to_string()),
            io::ErrorKind::PermissionDenied => FsError::AccessDenied(shown.to_string()),
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(shown.to_string()),
            _ => FsError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classifies_kinds() {
        let err = FsError::from_io(io::Error::from(io::ErrorKind::NotFound), "a/b");
        assert!(matches!(err, FsError::NotFound(p) if p == "a/b"));

        let err = FsError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), "");
        assert!(matches!(err, FsError::AccessDenied(p) if p == "/"));

        let err = FsError::from_io(io::Error::from(io::ErrorKind::AlreadyExists), "x");
        assert!(matches!(err, FsError::AlreadyExists(_)));

        let err = FsError::from_io(io::Error::from(io::ErrorKind::Interrupted), "x");
        assert!(matches!(err, FsError::Io(_)));
    }
}
