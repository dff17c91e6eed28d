//! Size-limited upload staging
//!
//! Upload bytes are streamed into a hidden staging file inside the storage
//! root. Nothing appears under the final name until `persist`, which links
//! the staged file into place without ever overwriting an existing entry.

use crate::sanitize::validate_segment;
use crate::{CanonicalPath, FsError, PathResolver, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Name prefix of staging files
pub const STAGING_PREFIX: &str = ".upload-";
const STAGING_SUFFIX: &str = ".part";

/// Whether `name` is an in-progress staging file
pub fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

/// An upload being received
///
/// Dropping it without calling `persist` removes the staged bytes.
#[derive(Debug)]
pub struct StagedUpload {
    name: String,
    file: Option<File>,
    staging_path: PathBuf,
    written: u64,
    limit: u64,
}

impl StagedUpload {
    /// Start staging a file called `name` (a single segment)
    pub fn begin(resolver: &PathResolver, name: &str, limit: u64) -> Result<Self> {
        validate_segment(name)?;

        let staging_path = resolver
            .root()
            .join(format!("{}{}{}", STAGING_PREFIX, uuid::Uuid::new_v4(), STAGING_SUFFIX));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging_path)
            .map_err(|e| FsError::from_io(e, name))?;

        tracing::debug!("Staging upload {:?} at {:?}", name, staging_path);

        Ok(Self {
            name: name.to_string(),
            file: Some(file),
            staging_path,
            written: 0,
            limit,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes received so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Reject early when the client announced a size over the limit
    pub fn check_declared_size(&self, declared: u64) -> Result<()> {
        if declared > self.limit {
            return Err(self.too_large());
        }
        Ok(())
    }

    /// Append a chunk, failing with `TooLarge` once the limit is crossed
    ///
    /// After an error the staged bytes are gone; the upload must be dropped.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let total = self.written.saturating_add(chunk.len() as u64);
        if total > self.limit {
            self.discard();
            return Err(self.too_large());
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| FsError::Io(io::Error::other("upload already closed")))?;

        if let Err(e) = file.write_all(chunk) {
            self.discard();
            return Err(FsError::from_io(e, &self.name));
        }

        self.written = total;
        Ok(())
    }

    /// Move the staged bytes to `directory/name`
    ///
    /// Fails with `AlreadyExists` instead of replacing an existing entry.
    pub fn persist(mut self, resolver: &PathResolver, directory: &CanonicalPath) -> Result<CanonicalPath> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| FsError::Io(io::Error::other("upload already closed")))?;
        file.flush().map_err(|e| FsError::from_io(e, &self.name))?;
        file.sync_all().map_err(|e| FsError::from_io(e, &self.name))?;
        drop(file);

        let dir = resolver.locate_existing(directory)?;
        if !dir.is_dir() {
            return Err(FsError::NotFound(format!("Not a directory: {}", directory)));
        }

        let target = directory.join(&self.name)?;
        let target_path = resolver.locate(&target)?;

        link_no_clobber(&self.staging_path, &target_path)
            .map_err(|e| FsError::from_io(e, target.as_str()))?;

        // The staging name is unlinked on drop
        tracing::info!("Stored upload {} ({} bytes)", target, self.written);
        Ok(target)
    }

    fn too_large(&self) -> FsError {
        FsError::TooLarge {
            name: self.name.clone(),
            limit: self.limit,
        }
    }

    fn discard(&mut self) {
        self.file = None;
        if let Err(e) = fs::remove_file(&self.staging_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove staging file {:?}: {}", self.staging_path, e);
            }
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        self.discard();
    }
}

/// Place `src` at `dst` unless something already exists there
fn link_no_clobber(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::hard_link(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            // Hard links are not available everywhere; copy into a fresh file
            tracing::debug!("hard_link failed ({}), copying upload instead", e);
            let mut target = OpenOptions::new().write(true).create_new(true).open(dst)?;
            let mut source = File::open(src)?;
            if let Err(e) = io::copy(&mut source, &mut target).and_then(|_| target.sync_all()) {
                let _ = fs::remove_file(dst);
                return Err(e);
            }
            Ok(())
        }
    }
}

/// Remove staging files left behind by an interrupted process
pub fn remove_stale_staging(resolver: &PathResolver) -> Result<usize> {
    let mut removed = 0;
    let reader = fs::read_dir(resolver.root()).map_err(|e| FsError::from_io(e, ""))?;

    for entry in reader.flatten() {
        let stale = entry
            .file_name()
            .to_str()
            .map(is_staging_name)
            .unwrap_or(false);
        if stale && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }

    if removed > 0 {
        tracing::info!("Removed {} stale upload staging files", removed);
    }
    Ok(removed)
}
