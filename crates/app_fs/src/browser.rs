//! Storage browser - one-level directory listing

use crate::content_type::detect_content_type;
use crate::upload::is_staging_name;
use crate::{CanonicalPath, FsError, PathResolver, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// File entry with metadata, read at listing time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: CanonicalPath,
    pub size: u64,
    pub mime_type: String,
    /// Unix seconds
    pub last_modified: i64,
}

/// Directory entry (children are not loaded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: CanonicalPath,
}

/// Immediate children of one directory
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    pub path: CanonicalPath,
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirectoryEntry>,
}

/// Hidden-file policy
///
/// `Hide` omits every entry whose name starts with `.`, files and
/// directories alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HiddenFiles {
    #[default]
    #[serde(rename = "hide")]
    Hide,
    #[serde(rename = "show")]
    Show,
}

/// Options for listing directory contents
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub hidden: HiddenFiles,
}

impl ListOptions {
    /// Would a listing leave out an entry called `name`?
    pub fn hides(&self, name: &str) -> bool {
        if is_staging_name(name) {
            return true;
        }
        self.hidden == HiddenFiles::Hide && name.starts_with('.')
    }
}

/// List the immediate children of `path`
///
/// Entries are ordered by natural name order so repeated listings are
/// stable. An entry whose metadata cannot be read is skipped with a warning;
/// only failure to open the directory itself is an error.
pub fn list_directory(
    resolver: &PathResolver,
    path: &CanonicalPath,
    options: &ListOptions,
) -> Result<DirectoryListing> {
    let dir = resolver.locate_existing(path)?;

    if !dir.is_dir() {
        return Err(FsError::NotFound(format!("Not a directory: {}", path)));
    }

    let reader = fs::read_dir(&dir).map_err(|e| FsError::from_io(e, path.as_str()))?;

    let mut listing = DirectoryListing {
        path: path.clone(),
        ..Default::default()
    };

    for entry in reader {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {:?}: {}", path.as_str(), e);
                continue;
            }
        };

        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(raw) => {
                tracing::warn!("Skipping non UTF-8 name in {:?}: {:?}", path.as_str(), raw);
                continue;
            }
        };

        if options.hides(&name) {
            continue;
        }

        let child = match path.join(&name) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Skipping unaddressable entry {:?}: {}", name, e);
                continue;
            }
        };

        let fs_path = entry.path();
        let metadata = match fs::metadata(&fs_path) {
            Ok(m) => m,
            Err(e) => {
                let err = FsError::MetadataUnavailable(format!("{}: {}", child, e));
                tracing::warn!("Omitting entry from listing: {}", err);
                continue;
            }
        };

        if is_symlink(&entry) && !target_contained(resolver, &fs_path) {
            tracing::warn!("Omitting symlink leaving the storage root: {}", child);
            continue;
        }

        if metadata.is_dir() {
            listing.directories.push(DirectoryEntry { name, path: child });
        } else if metadata.is_file() {
            match file_entry(name, child, &fs_path, &metadata) {
                Ok(entry) => listing.files.push(entry),
                Err(e) => tracing::warn!("Omitting entry from listing: {}", e),
            }
        }
    }

    listing.directories.sort_by(|a, b| compare_names(&a.name, &b.name));
    listing.files.sort_by(|a, b| compare_names(&a.name, &b.name));

    tracing::debug!(
        "Listed {:?}: {} directories, {} files",
        path.as_str(),
        listing.directories.len(),
        listing.files.len()
    );

    Ok(listing)
}

/// Read a single file's entry (e.g. right after an upload)
pub fn read_file_entry(resolver: &PathResolver, path: &CanonicalPath) -> Result<FileEntry> {
    let name = path
        .name()
        .ok_or_else(|| FsError::InvalidPath("the storage root is not a file".to_string()))?
        .to_string();

    let fs_path = resolver.locate_existing(path)?;
    let metadata = fs::metadata(&fs_path)
        .map_err(|e| FsError::MetadataUnavailable(format!("{}: {}", path, e)))?;

    if !metadata.is_file() {
        return Err(FsError::InvalidPath(format!("Not a file: {}", path)));
    }

    file_entry(name, path.clone(), &fs_path, &metadata)
}

fn file_entry(
    name: String,
    path: CanonicalPath,
    fs_path: &Path,
    metadata: &fs::Metadata,
) -> Result<FileEntry> {
    let last_modified = unix_seconds(metadata.modified(), &path)?;

    Ok(FileEntry {
        name,
        path,
        size: metadata.len(),
        mime_type: detect_content_type(fs_path),
        last_modified,
    })
}

/// Modification time as Unix seconds, negative before the epoch
fn unix_seconds(modified: io::Result<SystemTime>, path: &CanonicalPath) -> Result<i64> {
    let modified = modified
        .map_err(|e| FsError::MetadataUnavailable(format!("{}: modification time: {}", path, e)))?;

    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    })
}

fn is_symlink(entry: &fs::DirEntry) -> bool {
    entry.file_type().map(|t| t.is_symlink()).unwrap_or(false)
}

fn target_contained(resolver: &PathResolver, fs_path: &Path) -> bool {
    fs_path
        .canonicalize()
        .map(|real| resolver.contains(&real))
        .unwrap_or(false)
}

/// Natural order, exact name breaks ties between case variants
fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    natural_sort_key(a)
        .cmp(&natural_sort_key(b))
        .then_with(|| a.cmp(b))
}

/// Generate a natural sort key (handles numbers correctly)
/// "image2.jpg" < "image10.jpg"
fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut current_num = String::new();
    let mut current_str = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !current_str.is_empty() {
                parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
                current_str.clear();
            }
            current_num.push(c);
        } else {
            if !current_num.is_empty() {
                parts.push(NaturalSortPart::number(&current_num));
                current_num.clear();
            }
            current_str.push(c);
        }
    }

    if !current_num.is_empty() {
        parts.push(NaturalSortPart::number(&current_num));
    }
    if !current_str.is_empty() {
        parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
    }

    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalSortPart {
    Num(u64),
    Str(String),
}

impl NaturalSortPart {
    fn number(digits: &str) -> Self {
        match digits.parse::<u64>() {
            Ok(n) => NaturalSortPart::Num(n),
            Err(_) => NaturalSortPart::Str(digits.to_string()),
        }
    }
}
