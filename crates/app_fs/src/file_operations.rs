//! Create and delete operations inside the storage root

use crate::{CanonicalPath, FsError, PathResolver, Result};
use std::fs;
use std::io;

/// Create a single directory
///
/// Uses the atomic "create, fail if exists" primitive: an existing entry of
/// any kind yields `AlreadyExists`, a missing parent yields `NotFound`.
pub fn create_dir(resolver: &PathResolver, path: &CanonicalPath) -> Result<()> {
    if path.is_root() {
        return Err(FsError::AlreadyExists("/".to_string()));
    }

    let fs_path = resolver.locate(path)?;

    match fs::create_dir(&fs_path) {
        Ok(()) => {
            tracing::info!("Created directory: {}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let parent = path.parent().unwrap_or_default();
            Err(FsError::from_io(e, parent.as_str()))
        }
        Err(e) => Err(FsError::from_io(e, path.as_str())),
    }
}

/// Delete exactly one file
///
/// Returns `false` when nothing existed at `path`, so repeating a delete is a
/// harmless no-op. Directories are refused.
pub fn delete_file(resolver: &PathResolver, path: &CanonicalPath) -> Result<bool> {
    if path.is_root() {
        return Err(FsError::InvalidPath("cannot delete the storage root".to_string()));
    }

    let fs_path = resolver.locate(path)?;

    let metadata = match fs::symlink_metadata(&fs_path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(FsError::from_io(e, path.as_str())),
    };

    if metadata.is_dir() {
        return Err(FsError::InvalidPath(format!("{} is a directory", path)));
    }

    match fs::remove_file(&fs_path) {
        Ok(()) => {
            tracing::warn!("Permanently deleted file: {}", path);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FsError::from_io(e, path.as_str())),
    }
}

/// Delete a directory and all of its descendants
///
/// Returns `false` when nothing existed at `path`. The storage root itself
/// and non-directories are refused.
pub fn delete_dir(resolver: &PathResolver, path: &CanonicalPath) -> Result<bool> {
    if path.is_root() {
        return Err(FsError::InvalidPath("cannot delete the storage root".to_string()));
    }

    let fs_path = resolver.locate(path)?;

    let metadata = match fs::symlink_metadata(&fs_path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(FsError::from_io(e, path.as_str())),
    };

    if !metadata.is_dir() {
        return Err(FsError::InvalidPath(format!("{} is not a directory", path)));
    }

    match fs::remove_dir_all(&fs_path) {
        Ok(()) => {
            tracing::warn!("Permanently deleted directory: {}", path);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FsError::from_io(e, path.as_str())),
    }
}
