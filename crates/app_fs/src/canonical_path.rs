//! CanonicalPath - root-relative addressing inside the storage directory

use crate::sanitize::validate_segment;
use crate::{FsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Separator used by canonical paths, independent of the host OS
pub const SEPARATOR: char = '/';

/// A storage-root-relative path
///
/// Invariants:
/// - segments are joined with `/`, no leading or trailing separator
/// - no empty, `.` or `..` segment, no NUL or control characters
/// - the root is the empty string
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// The storage root
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Normalize a user-supplied directory string
    ///
    /// Backslashes are treated as separators, repeated separators collapse
    /// and leading/trailing separators are stripped. Any `.`/`..` segment is
    /// rejected rather than resolved.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.replace('\\', "/");
        let mut segments = Vec::new();

        for segment in normalized.split(SEPARATOR) {
            if segment.is_empty() {
                continue;
            }
            validate_segment(segment)?;
            segments.push(segment);
        }

        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over path segments (empty for the root)
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Last segment, `None` for the root
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit(SEPARATOR).next()
        }
    }

    /// Path with the last segment removed, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Append a single validated segment
    pub fn join(&self, name: &str) -> Result<Self> {
        validate_segment(name)?;
        if self.is_root() {
            Ok(Self(name.to_string()))
        } else {
            Ok(Self(format!("{}{}{}", self.0, SEPARATOR, name)))
        }
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CanonicalPath {
    type Error = FsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CanonicalPath> for String {
    fn from(path: CanonicalPath) -> Self {
        path.0
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps canonical paths onto the storage root and enforces containment
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Fully resolved storage root
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for an existing directory
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let resolved = root
            .canonicalize()
            .map_err(|e| FsError::from_io(e, &root.display().to_string()))?;

        if !resolved.is_dir() {
            return Err(FsError::InvalidPath(format!(
                "Storage root is not a directory: {}",
                resolved.display()
            )));
        }

        Ok(Self { root: resolved })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalize raw input into a canonical path (no I/O)
    pub fn resolve(&self, raw: &str) -> Result<CanonicalPath> {
        CanonicalPath::parse(raw)
    }

    /// Resolve a `(base directory, single-segment name)` pair (no I/O)
    pub fn resolve_child(&self, base: &str, name: &str) -> Result<CanonicalPath> {
        let base = CanonicalPath::parse(base)?;
        base.join(name)
    }

    /// Lexical mapping onto the host file system
    pub fn to_fs_path(&self, path: &CanonicalPath) -> PathBuf {
        let mut fs_path = self.root.clone();
        for segment in path.segments() {
            fs_path.push(segment);
        }
        fs_path
    }

    /// Host path for an entry that may not exist yet
    ///
    /// The final component is not followed; its nearest existing ancestor
    /// must resolve inside the root, so a symlinked parent cannot redirect
    /// writes outside of it.
    pub fn locate(&self, path: &CanonicalPath) -> Result<PathBuf> {
        let fs_path = self.to_fs_path(path);
        if path.is_root() {
            return Ok(fs_path);
        }

        let mut probe = fs_path.parent();
        while let Some(dir) = probe {
            match dir.canonicalize() {
                Ok(real) => {
                    self.ensure_contained(&real, path)?;
                    return Ok(fs_path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => probe = dir.parent(),
                Err(e) => return Err(FsError::from_io(e, path.as_str())),
            }
        }

        Err(FsError::InvalidPath(format!(
            "{} resolves outside the storage root",
            path
        )))
    }

    /// Host path for an existing entry, with every symlink resolved
    pub fn locate_existing(&self, path: &CanonicalPath) -> Result<PathBuf> {
        let fs_path = self.to_fs_path(path);
        let real = fs_path
            .canonicalize()
            .map_err(|e| FsError::from_io(e, path.as_str()))?;
        self.ensure_contained(&real, path)?;
        Ok(real)
    }

    /// Whether an already resolved host path lies inside the root
    pub fn contains(&self, real: &Path) -> bool {
        real.starts_with(&self.root)
    }

    fn ensure_contained(&self, real: &Path, path: &CanonicalPath) -> Result<()> {
        if self.contains(real) {
            Ok(())
        } else {
            tracing::warn!("Rejected path escaping storage root: {}", path);
            Err(FsError::InvalidPath(format!(
                "{} resolves outside the storage root",
                path
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_separators() {
        assert_eq!(CanonicalPath::parse("").unwrap().as_str(), "");
        assert_eq!(CanonicalPath::parse("/").unwrap().as_str(), "");
        assert_eq!(CanonicalPath::parse("/a//b/").unwrap().as_str(), "a/b");
        assert_eq!(CanonicalPath::parse("a\\b\\c").unwrap().as_str(), "a/b/c");
        assert_eq!(CanonicalPath::parse("///x///").unwrap().as_str(), "x");
    }

    #[test]
    fn test_parse_rejects_traversal() {
        for raw in ["..", "../etc", "a/../b", "a/..", "./a", "a/./b", "a\\..\\b"] {
            assert!(
                matches!(CanonicalPath::parse(raw), Err(FsError::InvalidPath(_))),
                "accepted {:?}",
                raw
            );
        }
        assert!(CanonicalPath::parse("a/b\0c").is_err());
    }

    #[test]
    fn test_parent_and_name() {
        let path = CanonicalPath::parse("a/b/c").unwrap();
        assert_eq!(path.name(), Some("c"));
        assert_eq!(path.parent().unwrap().as_str(), "a/b");
        assert_eq!(CanonicalPath::parse("a").unwrap().parent(), Some(CanonicalPath::root()));
        assert_eq!(CanonicalPath::root().parent(), None);
        assert_eq!(CanonicalPath::root().name(), None);
    }

    #[test]
    fn test_join_requires_single_segment() {
        let root = CanonicalPath::root();
        assert_eq!(root.join("foo").unwrap().as_str(), "foo");
        let foo = root.join("foo").unwrap();
        assert_eq!(foo.join("bar").unwrap().as_str(), "foo/bar");
        assert!(foo.join("bar/baz").is_err());
        assert!(foo.join("..").is_err());
        assert!(foo.join("").is_err());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let path: CanonicalPath = serde_json::from_str("\"/a//b\"").unwrap();
        assert_eq!(path.as_str(), "a/b");
        assert!(serde_json::from_str::<CanonicalPath>("\"../x\"").is_err());
    }

    #[test]
    fn test_resolver_maps_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path()).unwrap();

        let path = resolver.resolve_child("docs", "a.txt").unwrap();
        let fs_path = resolver.to_fs_path(&path);
        assert!(fs_path.starts_with(resolver.root()));
        assert!(fs_path.ends_with("docs/a.txt"));
        assert_eq!(resolver.to_fs_path(&CanonicalPath::root()), resolver.root());
    }

    #[test]
    fn test_resolver_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(PathResolver::new(&missing), Err(FsError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_rejects_symlink_escape() {
        let outside = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let resolver = PathResolver::new(dir.path()).unwrap();
        let through_link = CanonicalPath::parse("link/new").unwrap();
        assert!(matches!(
            resolver.locate(&through_link),
            Err(FsError::InvalidPath(_))
        ));
        assert!(matches!(
            resolver.locate_existing(&CanonicalPath::parse("link").unwrap()),
            Err(FsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_locate_allows_missing_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(dir.path()).unwrap();
        let path = CanonicalPath::parse("not/yet/there").unwrap();
        let fs_path = resolver.locate(&path).unwrap();
        assert!(fs_path.starts_with(resolver.root()));
    }
}
