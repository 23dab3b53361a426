//! # Error Types
//!
//! Validation failures for the identifiers parsed out of an inbound request.

use thiserror::Error;

/// A request identifier failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Repository name was empty.
    #[error("repository name is empty")]
    EmptyRepositoryName,

    /// Repository name exceeded the maximum length.
    #[error("repository name exceeds {max} bytes: {len}")]
    RepositoryNameTooLong { len: usize, max: usize },

    /// Repository name contained a character outside `[A-Za-z0-9._-]`
    /// or started with a dot.
    #[error("invalid repository name: {0:?}")]
    InvalidRepositoryName(String),

    /// The path below the repository was empty.
    #[error("path is empty")]
    EmptyPath,

    /// The path ended in `/` and so names a directory, not a file.
    #[error("path names a directory: {0:?}")]
    DirectoryPath(String),

    /// The path contained an empty, `.` or `..` segment.
    #[error("path contains a disallowed segment {segment:?}: {path:?}")]
    DisallowedSegment { path: String, segment: String },

    /// The path contained a NUL byte or a backslash.
    #[error("path contains a disallowed character: {0:?}")]
    DisallowedCharacter(String),
}
