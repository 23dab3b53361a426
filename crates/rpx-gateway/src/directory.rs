//! # Repository Directory
//!
//! Read-only lookup from repository name to upstream base URL. Base URLs
//! are returned with any trailing slash removed, so the request path can be
//! appended after a single `/`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rpx_core::RepositoryName;
use sqlx::PgPool;
use url::Url;

use crate::db;

/// Failure reading the repository directory, or a malformed stored entry.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("repository directory lookup failed: {0}")]
    Store(String),
    #[error("repository {repository} has an invalid base URL {base_url:?}: {reason}")]
    InvalidBaseUrl {
        repository: String,
        base_url: String,
        reason: String,
    },
}

/// Name-to-base-URL lookup.
#[async_trait]
pub trait RepositoryDirectory: Send + Sync {
    /// Base URL for `repository`, or `None` when it is not mapped.
    async fn lookup(&self, repository: &RepositoryName) -> Result<Option<BaseUrl>, DirectoryError>;
}

/// An absolute upstream base URL with no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Validate an absolute URL and strip trailing slashes.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let trimmed = raw.trim().trim_end_matches('/');
        Url::parse(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join an upstream-relative path onto this base with a single `/`.
    pub fn join(&self, rest: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/{}", self.0, rest))
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory backed by the `repository_map` table.
#[derive(Debug, Clone)]
pub struct PgRepositoryDirectory {
    pool: PgPool,
}

impl PgRepositoryDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RepositoryDirectory for PgRepositoryDirectory {
    async fn lookup(&self, repository: &RepositoryName) -> Result<Option<BaseUrl>, DirectoryError> {
        let raw = db::repositories::base_url(&self.pool, repository)
            .await
            .map_err(|e| DirectoryError::Store(e.to_string()))?;
        raw.map(|raw| {
            BaseUrl::parse(&raw).map_err(|e| DirectoryError::InvalidBaseUrl {
                repository: repository.to_string(),
                base_url: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }
}

/// Fixed directory built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRepositoryDirectory {
    entries: Arc<HashMap<RepositoryName, BaseUrl>>,
}

impl StaticRepositoryDirectory {
    pub fn new(entries: impl IntoIterator<Item = (RepositoryName, BaseUrl)>) -> Self {
        Self {
            entries: Arc::new(entries.into_iter().collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RepositoryDirectory for StaticRepositoryDirectory {
    async fn lookup(&self, repository: &RepositoryName) -> Result<Option<BaseUrl>, DirectoryError> {
        Ok(self.entries.get(repository).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_strips_trailing_slashes() {
        let base = BaseUrl::parse("https://example.org/repo//").unwrap();
        assert_eq!(base.as_str(), "https://example.org/repo");
    }

    #[test]
    fn base_url_rejects_relative() {
        assert!(BaseUrl::parse("example.org/repo").is_err());
        assert!(BaseUrl::parse("").is_err());
    }

    #[test]
    fn join_inserts_single_slash() {
        let base = BaseUrl::parse("https://example.org/repo/").unwrap();
        assert_eq!(
            base.join("a/b.tar").unwrap().as_str(),
            "https://example.org/repo/a/b.tar"
        );
    }

    #[test]
    fn join_keeps_percent_encoding() {
        let base = BaseUrl::parse("https://example.org").unwrap();
        assert_eq!(
            base.join("pool/lib%2B%2B.deb").unwrap().as_str(),
            "https://example.org/pool/lib%2B%2B.deb"
        );
    }

    #[tokio::test]
    async fn static_lookup() {
        let pkgs = RepositoryName::new("pkgs").unwrap();
        let dir = StaticRepositoryDirectory::new([(
            pkgs.clone(),
            BaseUrl::parse("https://example.org/repo").unwrap(),
        )]);
        assert_eq!(
            dir.lookup(&pkgs).await.unwrap().unwrap().as_str(),
            "https://example.org/repo"
        );
        let foo = RepositoryName::new("foo").unwrap();
        assert!(dir.lookup(&foo).await.unwrap().is_none());
    }
}
