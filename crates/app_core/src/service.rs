//! File manager operations over the storage root
//!
//! Every operation validates its paths before touching the disk and returns
//! the wire type the HTTP layer sends back unchanged.

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use api_proto::{
    Breadcrumb, CreateDirectoryRequest, DirectoryEntry, FileEntry, ListResponse, MessageResponse,
    PathRequest, UploadResponse, UploadResult,
};
use app_fs::{CanonicalPath, ListOptions, PathResolver, StagedUpload};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::io::{self, Read};
use std::path::PathBuf;

/// Chunk size used when copying from a reader into a staged upload
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Characters escaped in one URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// One file of an upload request, staged or already rejected
#[derive(Debug)]
pub struct PendingUpload {
    name: String,
    staged: std::result::Result<StagedUpload, AppError>,
}

impl PendingUpload {
    pub fn staged(upload: StagedUpload) -> Self {
        Self {
            name: upload.name().to_string(),
            staged: Ok(upload),
        }
    }

    pub fn failed(name: impl Into<String>, error: AppError) -> Self {
        Self {
            name: name.into(),
            staged: Err(error),
        }
    }
}

/// Storage-backed implementation of the file manager operations
#[derive(Debug, Clone)]
pub struct FileManager {
    resolver: PathResolver,
    options: ListOptions,
    public_prefix: String,
    max_upload_bytes: u64,
}

impl FileManager {
    /// Open (creating if needed) the configured storage root
    pub fn new(storage: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&storage.root).map_err(|e| {
            AppError::Init(format!(
                "Cannot create storage root {}: {}",
                storage.root.display(),
                e
            ))
        })?;

        let resolver = PathResolver::new(&storage.root)?;
        if let Err(e) = app_fs::remove_stale_staging(&resolver) {
            tracing::warn!("Could not sweep staging files: {}", e);
        }

        tracing::info!("Serving storage root {:?}", resolver.root());

        Ok(Self {
            resolver,
            options: ListOptions {
                hidden: storage.hidden_files,
            },
            public_prefix: storage.public_prefix(),
            max_upload_bytes: storage.max_upload_bytes,
        })
    }

    /// Public URL of a stored file, each segment percent-encoded
    pub fn url_for(&self, path: &CanonicalPath) -> String {
        let mut url = self.public_prefix.clone();
        for segment in path.segments() {
            url.push('/');
            url.extend(utf8_percent_encode(segment, SEGMENT));
        }
        url
    }

    /// Real path of a stored file that may be served publicly
    ///
    /// Only files a listing would show qualify. Hidden names, directories and
    /// anything resolving outside the root are `NotFound` or `InvalidPath`.
    pub fn locate_public(&self, raw: &str) -> Result<PathBuf> {
        let path = self.resolver.resolve(raw)?;
        if path.segments().any(|s| self.options.hides(s)) {
            return Err(AppError::NotFound(path.to_string()));
        }

        let file = self.resolver.locate_existing(&path)?;
        if !file.is_file() {
            return Err(AppError::NotFound(path.to_string()));
        }
        Ok(file)
    }

    /// List the immediate children of `directory`
    pub fn list(&self, directory: &str) -> Result<ListResponse> {
        let path = self.resolver.resolve(directory)?;
        let listing = app_fs::list_directory(&self.resolver, &path, &self.options)?;

        Ok(ListResponse {
            files: listing
                .files
                .into_iter()
                .map(|f| self.wire_file(f))
                .collect(),
            directories: listing
                .directories
                .into_iter()
                .map(|d| DirectoryEntry {
                    name: d.name,
                    path: d.path.into(),
                })
                .collect(),
            breadcrumbs: app_fs::build_breadcrumbs(&path)
                .into_iter()
                .map(|c| Breadcrumb {
                    name: c.name,
                    path: c.path.into(),
                })
                .collect(),
            parent_directory: app_fs::parent_of(&path).map(String::from),
            current_directory: path.into(),
        })
    }

    /// Create `request.name` inside `request.directory` (root when absent)
    pub fn create_directory(&self, request: &CreateDirectoryRequest) -> Result<MessageResponse> {
        let base = request.directory.as_deref().unwrap_or_default();
        let path = self.resolver.resolve_child(base, &request.name)?;
        if let Some(name) = path.name() {
            self.check_visible(name)?;
        }

        app_fs::create_dir(&self.resolver, &path)?;
        Ok(MessageResponse::new("Directory created successfully"))
    }

    /// Start receiving a file, enforcing the per-file limit
    pub fn begin_upload(&self, name: &str) -> Result<StagedUpload> {
        let staged = StagedUpload::begin(&self.resolver, name, self.max_upload_bytes)?;
        self.check_visible(staged.name())?;
        Ok(staged)
    }

    /// Move every staged file into `directory`, reporting each one
    ///
    /// An invalid or missing target directory fails the whole request; after
    /// that, a failure only affects its own file.
    pub fn finish_uploads(
        &self,
        directory: &str,
        pending: Vec<PendingUpload>,
    ) -> Result<UploadResponse> {
        let target = self.resolver.resolve(directory)?;
        let dir = self.resolver.locate_existing(&target)?;
        if !dir.is_dir() {
            return Err(AppError::NotFound(format!("Not a directory: {}", target)));
        }

        if pending.is_empty() {
            return Err(AppError::InvalidRequest("No files were uploaded".to_string()));
        }

        let mut files = Vec::with_capacity(pending.len());
        for upload in pending {
            let name = upload.name;
            let result = upload.staged.and_then(|staged| self.store(staged, &target));

            files.push(match result {
                Ok(entry) => UploadResult::stored(name, entry),
                Err(e) => {
                    if e.is_client_error() {
                        tracing::warn!("Upload of {:?} rejected: {}", name, e);
                    } else {
                        tracing::error!("Upload of {:?} failed: {}", name, e);
                    }
                    UploadResult::failed(name, e.to_response())
                }
            });
        }

        let response = UploadResponse { files };
        tracing::info!(
            "Upload into {:?}: {}/{} files stored",
            target.as_str(),
            response.stored_count(),
            response.files.len()
        );
        Ok(response)
    }

    /// Upload from in-memory or on-disk readers
    pub fn upload_from_readers<R: Read>(
        &self,
        directory: &str,
        files: Vec<(String, R)>,
    ) -> Result<UploadResponse> {
        // Reject a bad target before staging anything
        self.resolver.resolve(directory)?;

        let pending = files
            .into_iter()
            .map(|(name, reader)| match self.stage_reader(&name, reader) {
                Ok(staged) => PendingUpload::staged(staged),
                Err(e) => PendingUpload::failed(name, e),
            })
            .collect();

        self.finish_uploads(directory, pending)
    }

    /// Permanently delete a single file
    pub fn delete_file(&self, request: &PathRequest) -> Result<MessageResponse> {
        let path = self.resolver.resolve(&request.path)?;
        if !app_fs::delete_file(&self.resolver, &path)? {
            tracing::debug!("Delete of missing file {:?} ignored", path.as_str());
        }
        Ok(MessageResponse::new("File deleted successfully"))
    }

    /// Permanently delete a directory and everything below it
    pub fn delete_directory(&self, request: &PathRequest) -> Result<MessageResponse> {
        let path = self.resolver.resolve(&request.path)?;
        if !app_fs::delete_dir(&self.resolver, &path)? {
            tracing::debug!("Delete of missing directory {:?} ignored", path.as_str());
        }
        Ok(MessageResponse::new("Directory deleted successfully"))
    }

    /// Refuse names that the listing policy would never show
    fn check_visible(&self, name: &str) -> Result<()> {
        if self.options.hides(name) {
            return Err(AppError::InvalidPath(format!(
                "{} would be hidden from listings",
                name
            )));
        }
        Ok(())
    }

    fn stage_reader<R: Read>(&self, name: &str, mut reader: R) -> Result<StagedUpload> {
        let mut staged = self.begin_upload(name)?;
        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            staged.write_chunk(&buf[..n])?;
        }

        Ok(staged)
    }

    fn store(&self, staged: StagedUpload, directory: &CanonicalPath) -> Result<FileEntry> {
        let stored = staged.persist(&self.resolver, directory)?;
        let entry = app_fs::read_file_entry(&self.resolver, &stored)?;
        Ok(self.wire_file(entry))
    }

    fn wire_file(&self, file: app_fs::FileEntry) -> FileEntry {
        FileEntry {
            url: self.url_for(&file.path),
            name: file.name,
            path: file.path.into(),
            size: file.size,
            mime_type: file.mime_type,
            last_modified: file.last_modified,
        }
    }
}
