//! HTTP JSON contract between the file manager server and its clients
//!
//! Field names here are the wire format the browser front-end depends on;
//! changing them is an API break.

use serde::{Deserialize, Serialize};

/// Route paths
pub mod routes {
    pub const FILES: &str = "/file-manager/files";
    pub const DIRECTORY: &str = "/file-manager/directory";
    pub const UPLOAD: &str = "/file-manager/upload";
    pub const FILE: &str = "/file-manager/file";

    /// Multipart field carrying file parts
    pub const UPLOAD_FIELD: &str = "files[]";
    /// Multipart field naming the target directory
    pub const DIRECTORY_FIELD: &str = "directory";
}

/// Stable error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Traversal or malformed segment
    InvalidPath,
    /// Malformed request body (missing fields, bad multipart)
    InvalidRequest,
    NotFound,
    AlreadyExists,
    AccessDenied,
    TooLarge,
    MetadataUnavailable,
    Unknown,
}

impl ErrorKind {
    /// HTTP status for a response carrying this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidPath | ErrorKind::InvalidRequest | ErrorKind::AlreadyExists => 400,
            ErrorKind::AccessDenied => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::TooLarge => 413,
            ErrorKind::MetadataUnavailable | ErrorKind::Unknown => 500,
        }
    }
}

/// File in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    /// Unix seconds
    pub last_modified: i64,
}

/// Directory in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
}

/// Navigation waypoint; the first one is always the root (`path == ""`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// `GET /file-manager/files` query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub directory: String,
}

/// `GET /file-manager/files` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirectoryEntry>,
    pub current_directory: String,
    #[serde(default)]
    pub breadcrumbs: Vec<Breadcrumb>,
    #[serde(default)]
    pub parent_directory: Option<String>,
}

/// `POST /file-manager/directory` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectoryRequest {
    pub name: String,
    #[serde(default)]
    pub directory: Option<String>,
}

/// `DELETE /file-manager/file` and `DELETE /file-manager/directory` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

/// Success body of mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default = "unknown_kind")]
    pub kind: ErrorKind,
}

fn unknown_kind() -> ErrorKind {
    ErrorKind::Unknown
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
        }
    }
}

/// Outcome of one uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Stored,
    Failed,
}

/// Per-file upload result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Client-supplied file name
    pub name: String,
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl UploadResult {
    pub fn stored(name: impl Into<String>, file: FileEntry) -> Self {
        Self {
            name: name.into(),
            status: UploadStatus::Stored,
            file: Some(file),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: ErrorResponse) -> Self {
        Self {
            name: name.into(),
            status: UploadStatus::Failed,
            file: None,
            error: Some(error),
        }
    }

    pub fn is_stored(&self) -> bool {
        self.status == UploadStatus::Stored
    }
}

/// `POST /file-manager/upload` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<UploadResult>,
}

impl UploadResponse {
    pub fn stored_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_stored()).count()
    }

    /// 200 if anything landed, otherwise the status of the first failure
    pub fn status_code(&self) -> u16 {
        if self.stored_count() > 0 {
            return 200;
        }
        self.files
            .iter()
            .find_map(|f| f.error.as_ref())
            .map(|e| e.kind.status_code())
            .unwrap_or(400)
    }
}

/// Where a client finds the server, read from the `[client]` config section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 30,
        }
    }
}
