//! # rpx-gateway — Transparent Caching Gateway
//!
//! Serves `GET /<repository>/<path...>` from a local blob store when the
//! upstream copy is unchanged, and otherwise fetches it once, streaming the
//! body to the client and the cache in the same pass.
//!
//! ## Request Flow
//!
//! | Step | Module | Upstream contact |
//! |------|--------|------------------|
//! | Split path, resolve base URL | [`routing`] | none |
//! | Probe + index + blob check | [`validator`] | `HEAD` |
//! | HIT: serve from disk | [`routes::gateway`] | none |
//! | MISS: tee to client and blob, persist descriptor | [`pipeline`] | `GET` |
//!
//! ## Collaborators
//!
//! The repository directory and metadata index are trait objects in
//! [`state::AppState`]. With a database URL both are Postgres-backed
//! ([`db`]); without one the gateway uses the in-memory index and a static
//! directory from configuration.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! Health probes under `/-/` are mounted outside both layers.

pub mod blob;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod index;
pub mod middleware;
pub mod pipeline;
pub mod publish;
pub mod routes;
pub mod routing;
pub mod state;
pub mod validator;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::middleware::metrics::metrics_middleware;
use crate::state::AppState;

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let gateway = routes::gateway::router()
        .layer(from_fn_with_state(state.metrics.clone(), metrics_middleware))
        .layer(middleware::tracing_layer::layer());

    Router::new()
        .merge(routes::health::router())
        .merge(gateway)
        .with_state(state)
}
