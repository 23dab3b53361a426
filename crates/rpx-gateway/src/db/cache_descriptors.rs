//! Cache descriptor persistence.
//!
//! All functions take a `&PgPool` and operate on the `cache_descriptors`
//! table, keyed by `(repository, path)`.

use chrono::{DateTime, Utc};
use rpx_core::{CachePath, Descriptor, Fingerprint, RepositoryName};
use sqlx::PgPool;

/// Fetch the descriptor for a key.
pub async fn get(
    pool: &PgPool,
    repository: &RepositoryName,
    path: &CachePath,
) -> Result<Option<Descriptor>, sqlx::Error> {
    let row = sqlx::query_as::<_, DescriptorRow>(
        "SELECT last_modified, file_size, etag, updated_at
         FROM cache_descriptors WHERE repository = $1 AND path = $2",
    )
    .bind(repository.as_str())
    .bind(path.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(DescriptorRow::into_descriptor))
}

/// Insert or overwrite the descriptor for a key in one statement.
///
/// `updated_at` is set by the database so concurrent writers cannot
/// interleave a stale timestamp with a fresh fingerprint.
pub async fn upsert(
    pool: &PgPool,
    repository: &RepositoryName,
    path: &CachePath,
    fingerprint: &Fingerprint,
) -> Result<DateTime<Utc>, sqlx::Error> {
    let file_size = i64::try_from(fingerprint.file_size()).map_err(|e| {
        tracing::error!(size = fingerprint.file_size(), "file size does not fit BIGINT");
        sqlx::Error::Encode(Box::new(e))
    })?;

    let updated_at: DateTime<Utc> = sqlx::query_scalar(
        "INSERT INTO cache_descriptors (repository, path, last_modified, file_size, etag, updated_at)
         VALUES ($1, $2, $3, $4, $5, now())
         ON CONFLICT (repository, path) DO UPDATE SET
            last_modified = EXCLUDED.last_modified,
            file_size = EXCLUDED.file_size,
            etag = EXCLUDED.etag,
            updated_at = EXCLUDED.updated_at
         RETURNING updated_at",
    )
    .bind(repository.as_str())
    .bind(path.as_str())
    .bind(fingerprint.last_modified())
    .bind(file_size)
    .bind(fingerprint.etag())
    .fetch_one(pool)
    .await?;

    Ok(updated_at)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DescriptorRow {
    last_modified: String,
    file_size: i64,
    etag: String,
    updated_at: DateTime<Utc>,
}

impl DescriptorRow {
    fn into_descriptor(self) -> Descriptor {
        // Negative sizes can only come from out-of-band edits.
        let file_size = u64::try_from(self.file_size).unwrap_or(0);
        Descriptor {
            fingerprint: Fingerprint::new(self.last_modified, file_size, &self.etag),
            updated_at: self.updated_at,
        }
    }
}
