//! Health probes and counters.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::db;
use crate::error::GatewayError;
use crate::middleware::metrics::{GatewayMetrics, MetricsSnapshot};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/-/liveness", get(liveness))
        .route("/-/readiness", get(readiness))
        .route("/-/stats", get(stats))
}

/// Always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// 200 once the metadata store answers; in-memory mode is always ready.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, GatewayError> {
    if let Some(pool) = &state.db_pool {
        db::ping(pool)
            .await
            .map_err(|e| GatewayError::MetadataStore(e.to_string()))?;
    }
    Ok("ready")
}

async fn stats(State(metrics): State<GatewayMetrics>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}
