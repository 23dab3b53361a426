//! # Metadata Index
//!
//! Durable mapping from `(repository, path)` to the last-known [`Descriptor`].
//!
//! The index is never cached in process: every request reads it afresh, and
//! rows may be edited or removed out-of-band. Two implementations:
//!
//! - [`PgMetadataIndex`] — `cache_descriptors` table, single-statement upsert.
//! - [`MemoryMetadataIndex`] — process-local map for development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rpx_core::{CachePath, Descriptor, Fingerprint, RepositoryName};
use sqlx::PgPool;

use crate::db;

/// Failure reading or writing the metadata index.
#[derive(Debug, thiserror::Error)]
#[error("metadata index {operation} failed: {message}")]
pub struct IndexError {
    pub operation: &'static str,
    pub message: String,
}

impl IndexError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Key-value store of cache descriptors.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Look up the descriptor for a key.
    async fn get(
        &self,
        repository: &RepositoryName,
        path: &CachePath,
    ) -> Result<Option<Descriptor>, IndexError>;

    /// Insert or overwrite the descriptor for a key as one atomic unit.
    /// Idempotent under retry.
    async fn upsert(
        &self,
        repository: &RepositoryName,
        path: &CachePath,
        fingerprint: &Fingerprint,
    ) -> Result<Descriptor, IndexError>;
}

/// Postgres-backed index.
#[derive(Debug, Clone)]
pub struct PgMetadataIndex {
    pool: PgPool,
}

impl PgMetadataIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataIndex for PgMetadataIndex {
    async fn get(
        &self,
        repository: &RepositoryName,
        path: &CachePath,
    ) -> Result<Option<Descriptor>, IndexError> {
        db::cache_descriptors::get(&self.pool, repository, path)
            .await
            .map_err(|e| IndexError::new("get", e.to_string()))
    }

    async fn upsert(
        &self,
        repository: &RepositoryName,
        path: &CachePath,
        fingerprint: &Fingerprint,
    ) -> Result<Descriptor, IndexError> {
        let updated_at = db::cache_descriptors::upsert(&self.pool, repository, path, fingerprint)
            .await
            .map_err(|e| IndexError::new("upsert", e.to_string()))?;
        Ok(Descriptor {
            fingerprint: fingerprint.clone(),
            updated_at,
        })
    }
}

type Key = (RepositoryName, CachePath);

/// Thread-safe in-memory index.
///
/// The lock is `parking_lot` and is never held across `.await`.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataIndex {
    data: Arc<RwLock<HashMap<Key, Descriptor>>>,
}

impl MemoryMetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored descriptors.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove a descriptor, as an operator editing the index out-of-band would.
    pub fn remove(&self, repository: &RepositoryName, path: &CachePath) -> Option<Descriptor> {
        self.data
            .write()
            .remove(&(repository.clone(), path.clone()))
    }
}

#[async_trait]
impl MetadataIndex for MemoryMetadataIndex {
    async fn get(
        &self,
        repository: &RepositoryName,
        path: &CachePath,
    ) -> Result<Option<Descriptor>, IndexError> {
        Ok(self
            .data
            .read()
            .get(&(repository.clone(), path.clone()))
            .cloned())
    }

    async fn upsert(
        &self,
        repository: &RepositoryName,
        path: &CachePath,
        fingerprint: &Fingerprint,
    ) -> Result<Descriptor, IndexError> {
        let descriptor = Descriptor::now(fingerprint.clone());
        self.data
            .write()
            .insert((repository.clone(), path.clone()), descriptor.clone());
        Ok(descriptor)
    }
}
