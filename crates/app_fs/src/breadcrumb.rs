//! Breadcrumb derivation for hierarchical navigation

use crate::CanonicalPath;

/// Display name of the synthetic first breadcrumb
pub const ROOT_LABEL: &str = "Root";

/// A named waypoint pointing at a path prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    pub path: CanonicalPath,
}

/// Build the breadcrumb trail for `path`, always starting at the root
///
/// `a/b/c` yields `Root -> a -> a/b -> a/b/c`.
pub fn build_breadcrumbs(path: &CanonicalPath) -> Vec<Breadcrumb> {
    let mut crumbs = Vec::with_capacity(path.segments().count() + 1);
    crumbs.push(Breadcrumb {
        name: ROOT_LABEL.to_string(),
        path: CanonicalPath::root(),
    });

    let mut prefix = CanonicalPath::root();
    for segment in path.segments() {
        // Segments of a canonical path are already valid
        prefix = match prefix.join(segment) {
            Ok(next) => next,
            Err(_) => break,
        };
        crumbs.push(Breadcrumb {
            name: segment.to_string(),
            path: prefix.clone(),
        });
    }

    crumbs
}

/// Parent directory, `None` at the root
pub fn parent_of(path: &CanonicalPath) -> Option<CanonicalPath> {
    path.parent()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(crumbs: &[Breadcrumb]) -> Vec<(&str, &str)> {
        crumbs
            .iter()
            .map(|c| (c.name.as_str(), c.path.as_str()))
            .collect()
    }

    #[test]
    fn test_root_only() {
        let crumbs = build_breadcrumbs(&CanonicalPath::root());
        assert_eq!(pairs(&crumbs), vec![("Root", "")]);
    }

    #[test]
    fn test_nested_path() {
        let path = CanonicalPath::parse("a/b/c").unwrap();
        let crumbs = build_breadcrumbs(&path);
        assert_eq!(
            pairs(&crumbs),
            vec![("Root", ""), ("a", "a"), ("b", "a/b"), ("c", "a/b/c")]
        );
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of(&CanonicalPath::root()), None);
        let path = CanonicalPath::parse("a/b").unwrap();
        assert_eq!(parent_of(&path).unwrap().as_str(), "a");
        let path = CanonicalPath::parse("a").unwrap();
        assert_eq!(parent_of(&path).unwrap().as_str(), "");
    }
}
