//! Path segment validation

use crate::{FsError, Result};

/// Longest accepted single segment (bytes), matching common file system limits
pub const MAX_SEGMENT_LEN: usize = 255;

/// Validate one path segment (a file or directory name)
///
/// Rejects empty names, `.` and `..`, separators, NUL and other control
/// characters. Anything else is passed through untouched; names are never
/// rewritten.
pub fn validate_segment(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FsError::InvalidPath("empty name".to_string()));
    }

    if name == "." || name == ".." {
        return Err(FsError::InvalidPath(format!("relative segment: {}", name)));
    }

    if name.len() > MAX_SEGMENT_LEN {
        return Err(FsError::InvalidPath(format!(
            "name longer than {} bytes",
            MAX_SEGMENT_LEN
        )));
    }

    for c in name.chars() {
        if c == '/' || c == '\\' {
            return Err(FsError::InvalidPath(format!(
                "name must be a single segment: {}",
                name
            )));
        }
        if c == '\0' {
            return Err(FsError::InvalidPath("name contains a null byte".to_string()));
        }
        if c.is_control() {
            return Err(FsError::InvalidPath(format!(
                "name contains control character U+{:04X}",
                c as u32
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_normal_names() {
        assert!(validate_segment("normal.txt").is_ok());
        assert!(validate_segment(".gitignore").is_ok());
        assert!(validate_segment("with space").is_ok());
        assert!(validate_segment("日本語.jpg").is_ok());
        assert!(validate_segment("..hidden").is_ok());
    }

    #[test]
    fn test_rejects_relative_segments() {
        assert!(matches!(validate_segment("."), Err(FsError::InvalidPath(_))));
        assert!(matches!(validate_segment(".."), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn test_rejects_separators_and_controls() {
        assert!(validate_segment("a/b").is_err());
        assert!(validate_segment("a\\b").is_err());
        assert!(validate_segment("nul\0byte").is_err());
        assert!(validate_segment("tab\there").is_err());
        assert!(validate_segment("").is_err());
    }

    #[test]
    fn test_rejects_overlong_names() {
        let name = "a".repeat(MAX_SEGMENT_LEN);
        assert!(validate_segment(&name).is_ok());
        let name = "a".repeat(MAX_SEGMENT_LEN + 1);
        assert!(validate_segment(&name).is_err());
    }
}
