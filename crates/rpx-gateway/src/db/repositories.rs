//! Repository directory persistence.
//!
//! Read-only from the gateway's point of view; rows in `repository_map` are
//! managed out-of-band.

use rpx_core::RepositoryName;
use sqlx::PgPool;

/// Fetch the raw base URL mapped to a repository.
pub async fn base_url(
    pool: &PgPool,
    repository: &RepositoryName,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT base_url FROM repository_map WHERE name = $1")
        .bind(repository.as_str())
        .fetch_optional(pool)
        .await
}
