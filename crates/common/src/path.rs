//! Canonical repository paths.
//!
//! Directory paths are always absolute and always end in `/`; the root is
//!  the literal `/`. `docs`, `/docs`, `//docs/` all canonicalize to
//!  `/docs/`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path segment {segment:?} in {path:?}")]
    InvalidSegment { path: String, segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath {
    segments: Vec<String>,
}

impl RepoPath {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn parse(path: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." || segment.contains('\0') {
                return Err(PathError::InvalidSegment {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` for the root
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Enclosing directory, `None` for the root
    pub fn parent(&self) -> Option<RepoPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn join(&self, name: &str) -> Result<RepoPath, PathError> {
        let mut joined = self.clone();
        joined.segments.extend(RepoPath::parse(name)?.segments);
        Ok(joined)
    }

    /// True if `self` is `other` or one of its ancestors
    pub fn is_ancestor_of(&self, other: &RepoPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Canonical directory form: `/` or `/a/b/`
    pub fn as_dir_string(&self) -> String {
        if self.is_root() {
            return "/".to_string();
        }
        format!("/{}/", self.segments.join("/"))
    }

    /// File form without the trailing slash: `/a/b.txt`
    pub fn as_file_string(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_dir_string())
    }
}

impl FromStr for RepoPath {
    type Err = PathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepoPath {
    type Error = PathError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoPath> for String {
    fn from(value: RepoPath) -> Self {
        value.as_dir_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        assert_eq!(RepoPath::parse("").unwrap().to_string(), "/");
        assert_eq!(RepoPath::parse("/").unwrap().to_string(), "/");
        assert_eq!(RepoPath::parse("docs").unwrap().to_string(), "/docs/");
        assert_eq!(RepoPath::parse("/docs").unwrap().to_string(), "/docs/");
        assert_eq!(RepoPath::parse("//docs///a/").unwrap().to_string(), "/docs/a/");
        assert_eq!(
            RepoPath::parse("/docs/a.txt").unwrap().as_file_string(),
            "/docs/a.txt"
        );
    }

    #[test]
    fn test_rejects_dot_segments() {
        assert!(RepoPath::parse("/docs/../etc").is_err());
        assert!(RepoPath::parse("/./docs").is_err());
    }

    #[test]
    fn test_parent_and_ancestry() {
        let path = RepoPath::parse("/a/b/c/").unwrap();
        assert_eq!(path.name(), Some("c"));
        assert_eq!(path.parent().unwrap().to_string(), "/a/b/");
        assert!(RepoPath::root().parent().is_none());

        let a = RepoPath::parse("/a").unwrap();
        assert!(a.is_ancestor_of(&path));
        assert!(path.is_ancestor_of(&path));
        assert!(RepoPath::root().is_ancestor_of(&path));
        assert!(!path.is_ancestor_of(&a));
        // prefix match is per segment, not per character
        assert!(!RepoPath::parse("/a/b/c").unwrap().is_ancestor_of(&RepoPath::parse("/a/b/cd").unwrap()));
    }

    #[test]
    fn test_join() {
        let docs = RepoPath::parse("/docs/").unwrap();
        assert_eq!(docs.join("2024/q1").unwrap().to_string(), "/docs/2024/q1/");
        assert!(docs.join("..").is_err());
    }
}
