//! # Database Persistence Layer
//!
//! Postgres persistence for the repository directory and the metadata index
//! via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When a database URL is configured the
//! gateway reads repository mappings from `repository_map` and keeps cache
//! descriptors in `cache_descriptors`. When absent, the gateway runs with the
//! in-memory index and the static directory built from configuration, and
//! descriptors do not survive restarts.

pub mod cache_descriptors;
pub mod repositories;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to Postgres and run the embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Round-trip a trivial query; used by the readiness probe.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
