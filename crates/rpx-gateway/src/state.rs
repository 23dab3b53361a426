//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Every collaborator is constructed explicitly and
//! injected here; nothing is a process-wide singleton, so tests can swap the
//! index or directory for fakes.

use std::sync::Arc;

use axum::extract::FromRef;
use rpx_upstream::{UpstreamClient, UpstreamError};
use sqlx::PgPool;

use crate::blob::BlobStore;
use crate::config::GatewayConfig;
use crate::directory::{PgRepositoryDirectory, RepositoryDirectory, StaticRepositoryDirectory};
use crate::index::{MemoryMetadataIndex, MetadataIndex, PgMetadataIndex};
use crate::middleware::metrics::GatewayMetrics;
use crate::publish::PublishLocks;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub upstream: UpstreamClient,
    pub index: Arc<dyn MetadataIndex>,
    pub directory: Arc<dyn RepositoryDirectory>,
    pub blobs: BlobStore,
    pub publish_locks: PublishLocks,
    pub metrics: GatewayMetrics,
    /// Present when the gateway runs against Postgres; used by readiness.
    pub db_pool: Option<PgPool>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("blobs", &self.blobs)
            .field("db_pool", &self.db_pool.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Assemble state from explicit collaborators.
    pub fn new(
        config: GatewayConfig,
        index: Arc<dyn MetadataIndex>,
        directory: Arc<dyn RepositoryDirectory>,
    ) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let blobs = BlobStore::new(config.cache_dir.clone());
        Ok(Self {
            config: Arc::new(config),
            upstream,
            index,
            directory,
            blobs,
            publish_locks: PublishLocks::new(),
            metrics: GatewayMetrics::new(),
            db_pool: None,
        })
    }

    /// Build state from configuration.
    ///
    /// With a pool, both the directory and the index are Postgres-backed.
    /// Without one, the index lives in memory and the directory holds the
    /// configured static mappings.
    pub fn from_config(config: GatewayConfig, pool: Option<PgPool>) -> Result<Self, UpstreamError> {
        match pool {
            Some(pool) => {
                let mut state = Self::new(
                    config,
                    Arc::new(PgMetadataIndex::new(pool.clone())),
                    Arc::new(PgRepositoryDirectory::new(pool.clone())),
                )?;
                state.db_pool = Some(pool);
                Ok(state)
            }
            None => {
                let directory = StaticRepositoryDirectory::new(config.repositories.clone());
                if directory.is_empty() {
                    tracing::warn!("no repositories configured; every request will return 404");
                }
                Self::new(
                    config,
                    Arc::new(MemoryMetadataIndex::new()),
                    Arc::new(directory),
                )
            }
        }
    }
}

impl FromRef<AppState> for GatewayMetrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}
