//! # Request Router
//!
//! Splits an inbound `/<repository>/<rest>` path once after the repository
//! component and resolves the upstream target by appending `rest`, unmodified,
//! to the repository's base URL.

use rpx_core::{CachePath, RepositoryName};
use url::Url;

use crate::error::GatewayError;
use crate::state::AppState;

/// A request resolved to a cache key and an upstream URL.
#[derive(Debug, Clone)]
pub struct RoutedRequest {
    pub repository: RepositoryName,
    pub path: CachePath,
    pub target: Url,
}

/// Split a raw request path into its repository and cache path.
///
/// The leading `/` is required. Everything after the first `/` following the
/// repository name is the upstream-relative path.
pub fn parse_request_path(raw: &str) -> Result<(RepositoryName, CachePath), GatewayError> {
    let trimmed = raw
        .strip_prefix('/')
        .ok_or_else(|| GatewayError::InvalidPath(raw.to_string()))?;
    let (repository, rest) = trimmed
        .split_once('/')
        .ok_or_else(|| GatewayError::InvalidPath(raw.to_string()))?;
    let repository = RepositoryName::new(repository)?;
    let path = CachePath::new(rest)?;
    Ok((repository, path))
}

/// Resolve `raw` against the repository directory.
///
/// No upstream contact happens here. An unmapped repository is
/// [`GatewayError::RepositoryNotFound`].
pub async fn route(state: &AppState, raw: &str) -> Result<RoutedRequest, GatewayError> {
    let (repository, path) = parse_request_path(raw)?;
    let base = state
        .directory
        .lookup(&repository)
        .await?
        .ok_or_else(|| GatewayError::RepositoryNotFound(repository.to_string()))?;
    let target = base
        .join(path.as_str())
        .map_err(|e| GatewayError::InvalidPath(format!("{repository}/{path}: {e}")))?;
    Ok(RoutedRequest {
        repository,
        path,
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::GatewayConfig;
    use crate::directory::{BaseUrl, StaticRepositoryDirectory};
    use crate::index::MemoryMetadataIndex;

    fn state() -> AppState {
        let directory = StaticRepositoryDirectory::new([(
            RepositoryName::new("pkgs").unwrap(),
            BaseUrl::parse("https://example.org/repo/").unwrap(),
        )]);
        AppState::new(
            GatewayConfig::default(),
            Arc::new(MemoryMetadataIndex::new()),
            Arc::new(directory),
        )
        .unwrap()
    }

    #[test]
    fn splits_once_after_repository() {
        let (repo, path) = parse_request_path("/pkgs/a/b/c.tar").unwrap();
        assert_eq!(repo.as_str(), "pkgs");
        assert_eq!(path.as_str(), "a/b/c.tar");
    }

    #[test]
    fn rejects_missing_rest() {
        assert!(matches!(
            parse_request_path("/pkgs"),
            Err(GatewayError::InvalidPath(_))
        ));
        assert!(matches!(
            parse_request_path("/pkgs/"),
            Err(GatewayError::InvalidPath(_))
        ));
    }

    #[test]
    fn rejects_traversal() {
        assert!(matches!(
            parse_request_path("/pkgs/../etc/passwd"),
            Err(GatewayError::InvalidPath(_))
        ));
        assert!(matches!(
            parse_request_path("/../x"),
            Err(GatewayError::InvalidPath(_))
        ));
    }

    #[test]
    fn rejects_percent_encoded_traversal() {
        for raw in ["/pkgs/%2e%2e/%2E%2E/secret", "/pkgs/a/.%2e/b"] {
            assert!(
                matches!(parse_request_path(raw), Err(GatewayError::InvalidPath(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_staging_name() {
        assert!(parse_request_path("/.staging/x.part").is_err());
    }

    #[tokio::test]
    async fn resolves_target_url() {
        let routed = route(&state(), "/pkgs/a/b.tar").await.unwrap();
        assert_eq!(routed.target.as_str(), "https://example.org/repo/a/b.tar");
        assert_eq!(routed.path.as_str(), "a/b.tar");
    }

    #[tokio::test]
    async fn unknown_repository_is_not_found() {
        let err = route(&state(), "/foo/a/b.tar").await.unwrap_err();
        assert!(matches!(err, GatewayError::RepositoryNotFound(name) if name == "foo"));
    }
}
