//! Display helpers for rendering a listing

use api_proto::{DirectoryEntry, FileEntry};
use chrono::DateTime;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size with one decimal, base 1024
///
/// `0` is special-cased to `"0 Bytes"`; anything past GB stays in GB.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, SIZE_UNITS[unit])
}

/// `YYYY-MM-DD HH:MM` in UTC for a Unix-seconds timestamp
pub fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Directory,
    File,
}

/// One line of the file table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub kind: RowKind,
    pub name: String,
    pub path: String,
    /// Formatted size, empty for directories
    pub size: String,
    pub modified: String,
    pub url: Option<String>,
}

/// Directories first, then files, each in listing order
pub fn display_rows(directories: &[DirectoryEntry], files: &[FileEntry]) -> Vec<DisplayRow> {
    let dirs = directories.iter().map(|d| DisplayRow {
        kind: RowKind::Directory,
        name: d.name.clone(),
        path: d.path.clone(),
        size: String::new(),
        modified: String::new(),
        url: None,
    });

    let files = files.iter().map(|f| DisplayRow {
        kind: RowKind::File,
        name: f.name.clone(),
        path: f.path.clone(),
        size: format_size(f.size),
        modified: format_timestamp(f.last_modified),
        url: Some(f.url.clone()),
    });

    dirs.chain(files).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512.0 Bytes");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024 * 1024), "3072.0 GB");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13");
    }

    #[test]
    fn test_directories_come_first() {
        let directories = vec![DirectoryEntry {
            name: "docs".to_string(),
            path: "docs".to_string(),
        }];
        let files = vec![FileEntry {
            name: "a.txt".to_string(),
            path: "a.txt".to_string(),
            url: "/storage/a.txt".to_string(),
            size: 2048,
            mime_type: "text/plain".to_string(),
            last_modified: 0,
        }];

        let rows = display_rows(&directories, &files);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, RowKind::Directory);
        assert_eq!(rows[0].size, "");
        assert_eq!(rows[1].kind, RowKind::File);
        assert_eq!(rows[1].size, "2.0 KB");
        assert_eq!(rows[1].url.as_deref(), Some("/storage/a.txt"));
    }
}
