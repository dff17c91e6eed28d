//! Transport seam between the store and the server

use crate::Result;
use api_proto::{CreateDirectoryRequest, ListResponse, MessageResponse, UploadResponse};
use async_trait::async_trait;

/// A file picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// The five file manager endpoints
#[async_trait]
pub trait FileManagerApi: Send + Sync {
    /// `GET /file-manager/files`
    async fn list(&self, directory: &str) -> Result<ListResponse>;

    /// `POST /file-manager/directory`
    async fn create_directory(&self, request: &CreateDirectoryRequest) -> Result<MessageResponse>;

    /// `POST /file-manager/upload`
    ///
    /// Per-file failures come back inside the response, not as `Err`.
    async fn upload(&self, directory: &str, files: Vec<UploadFile>) -> Result<UploadResponse>;

    /// `DELETE /file-manager/file`
    async fn delete_file(&self, path: &str) -> Result<MessageResponse>;

    /// `DELETE /file-manager/directory`
    async fn delete_directory(&self, path: &str) -> Result<MessageResponse>;
}
