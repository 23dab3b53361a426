//! # Request Identity Newtypes
//!
//! Every cached object is addressed by a `(RepositoryName, CachePath)` pair.
//! Both halves are validated once, when the request is routed, so the blob
//! store and the metadata index can treat them as trusted keys.
//!
//! ## Security Invariant
//!
//! A `CachePath` never contains an empty, `.` or `..` segment (including
//! the percent-encoded spellings such as `%2e%2e`), never starts or ends
//! with `/`, and never contains a NUL or backslash. Joining it onto
//! a directory therefore stays inside that directory.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a repository name, in bytes.
pub const MAX_REPOSITORY_NAME_LEN: usize = 64;

/// Logical name of an upstream repository (the first path component of a
/// gateway request).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validate and wrap a repository name.
    ///
    /// Accepts 1 to [`MAX_REPOSITORY_NAME_LEN`] bytes of `[A-Za-z0-9._-]`,
    /// not starting with a dot.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let name = raw.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyRepositoryName);
        }
        if name.len() > MAX_REPOSITORY_NAME_LEN {
            return Err(ValidationError::RepositoryNameTooLong {
                len: name.len(),
                max: MAX_REPOSITORY_NAME_LEN,
            });
        }
        let allowed = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !allowed || name.starts_with('.') {
            return Err(ValidationError::InvalidRepositoryName(name));
        }
        Ok(Self(name))
    }

    /// Access the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepositoryName> for String {
    fn from(value: RepositoryName) -> Self {
        value.0
    }
}

impl std::str::FromStr for RepositoryName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Upstream-relative path of a cached object, below its repository.
///
/// Kept byte-for-byte as it appeared in the request (still percent-encoded),
/// since the same string is appended to the upstream base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CachePath(String);

impl CachePath {
    /// Validate and wrap a relative path.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let path = raw.into();
        if path.is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        if path.contains('\0') || path.contains('\\') {
            return Err(ValidationError::DisallowedCharacter(path));
        }
        if path.ends_with('/') {
            return Err(ValidationError::DirectoryPath(path));
        }
        if let Some(segment) = path
            .split('/')
            .find(|s| s.is_empty() || is_dot_segment(s))
        {
            let segment = segment.to_string();
            return Err(ValidationError::DisallowedSegment { path, segment });
        }
        Ok(Self(path))
    }

    /// Access the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

/// `.` or `..`, literally or with any of its dots written as `%2e`/`%2E`.
/// Upstream servers normalize these after decoding.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

impl std::fmt::Display for CachePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CachePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CachePath {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CachePath> for String {
    fn from(value: CachePath) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_name_accepts_typical_names() {
        for name in ["pkgs", "alpine-3.19", "debian_main", "R2"] {
            assert_eq!(RepositoryName::new(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn repository_name_rejects_empty() {
        assert_eq!(
            RepositoryName::new(""),
            Err(ValidationError::EmptyRepositoryName)
        );
    }

    #[test]
    fn repository_name_rejects_leading_dot() {
        assert!(matches!(
            RepositoryName::new(".staging"),
            Err(ValidationError::InvalidRepositoryName(_))
        ));
    }

    #[test]
    fn repository_name_rejects_slash_and_space() {
        assert!(RepositoryName::new("a/b").is_err());
        assert!(RepositoryName::new("a b").is_err());
    }

    #[test]
    fn repository_name_rejects_overlong() {
        let name = "a".repeat(MAX_REPOSITORY_NAME_LEN + 1);
        assert!(matches!(
            RepositoryName::new(name),
            Err(ValidationError::RepositoryNameTooLong { len: 65, max: 64 })
        ));
        assert!(RepositoryName::new("a".repeat(MAX_REPOSITORY_NAME_LEN)).is_ok());
    }

    #[test]
    fn cache_path_keeps_nested_segments() {
        let path = CachePath::new("a/b.tar").unwrap();
        assert_eq!(path.as_str(), "a/b.tar");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b.tar"]);
    }

    #[test]
    fn cache_path_keeps_percent_encoding() {
        let path = CachePath::new("pool/lib%2B%2B/x.deb").unwrap();
        assert_eq!(path.as_str(), "pool/lib%2B%2B/x.deb");
    }

    #[test]
    fn cache_path_rejects_traversal() {
        for raw in ["../etc/passwd", "a/../../b", "a/./b", "./a"] {
            assert!(
                matches!(
                    CachePath::new(raw),
                    Err(ValidationError::DisallowedSegment { .. })
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn cache_path_rejects_encoded_traversal() {
        for raw in ["%2e%2e/secret", "a/%2E%2E/%2e%2e/b", ".%2e/x", "%2e./x", "a/%2e/b"] {
            assert!(
                matches!(
                    CachePath::new(raw),
                    Err(ValidationError::DisallowedSegment { .. })
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn encoded_dots_within_segment_are_allowed() {
        assert!(CachePath::new("a/%2e%2e%2e/b").is_ok());
        assert!(CachePath::new("pkg%2etar").is_ok());
    }

    #[test]
    fn cache_path_rejects_empty_segments() {
        assert!(CachePath::new("/abs").is_err());
        assert!(CachePath::new("a//b").is_err());
    }

    #[test]
    fn cache_path_rejects_directory_and_empty() {
        assert_eq!(CachePath::new(""), Err(ValidationError::EmptyPath));
        assert!(matches!(
            CachePath::new("dists/"),
            Err(ValidationError::DirectoryPath(_))
        ));
    }

    #[test]
    fn cache_path_rejects_nul_and_backslash() {
        assert!(CachePath::new("a\0b").is_err());
        assert!(CachePath::new("a\\..\\b").is_err());
    }

    #[test]
    fn dot_within_segment_is_allowed() {
        assert!(CachePath::new("a/..b/c..").is_ok());
        assert!(CachePath::new(".well-known/x").is_ok());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any accepted path stays below its root when joined.
            #[test]
            fn accepted_paths_never_escape(raw in "[a-z./]{1,24}") {
                if let Ok(path) = CachePath::new(raw) {
                    let root = std::path::Path::new("/root");
                    let joined = root.join(path.as_str());
                    let normal = joined
                        .components()
                        .all(|c| matches!(c, std::path::Component::RootDir | std::path::Component::Normal(_)));
                    prop_assert!(normal, "joined path has non-normal component: {:?}", joined);
                    prop_assert!(joined.starts_with(root));
                }
            }

            /// Valid names survive a string round trip unchanged.
            #[test]
            fn repository_name_round_trip(raw in "[A-Za-z0-9_-][A-Za-z0-9._-]{0,40}") {
                let name = RepositoryName::new(raw.clone()).unwrap();
                prop_assert_eq!(String::from(name), raw);
            }
        }
    }
}
