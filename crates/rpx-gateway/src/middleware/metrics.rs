//! # Gateway Metrics
//!
//! In-process atomic counters for requests and cache outcomes, reported as
//! JSON at `/-/stats`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

/// Shared counters.
#[derive(Debug, Clone, Default)]
pub struct GatewayMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    index_read_failures: AtomicU64,
    persist_failures: AtomicU64,
    upstream_errors: AtomicU64,
    uncached_serves: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub hits: u64,
    pub misses: u64,
    pub index_read_failures: u64,
    pub persist_failures: u64,
    pub upstream_errors: u64,
    pub uncached_serves: u64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.inner.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// The metadata index could not be read and the request degraded to MISS.
    pub fn record_index_read_failure(&self) {
        self.inner.index_read_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A descriptor could not be persisted after a successful stream.
    pub fn record_persist_failure(&self) {
        self.inner.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Upstream was unreachable or answered with an error status.
    pub fn record_upstream_error(&self) {
        self.inner.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A MISS was served without being written to the blob store.
    pub fn record_uncached_serve(&self) {
        self.inner.uncached_serves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.inner;
        MetricsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            index_read_failures: c.index_read_failures.load(Ordering::Relaxed),
            persist_failures: c.persist_failures.load(Ordering::Relaxed),
            upstream_errors: c.upstream_errors.load(Ordering::Relaxed),
            uncached_serves: c.uncached_serves.load(Ordering::Relaxed),
        }
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(
    State(metrics): State<GatewayMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    metrics.inner.requests.fetch_add(1, Ordering::Relaxed);
    if response.status().is_server_error() || response.status().is_client_error() {
        metrics.inner.errors.fetch_add(1, Ordering::Relaxed);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = GatewayMetrics::new();
        let s = m.snapshot();
        assert_eq!(s.requests, 0);
        assert_eq!(s.hits, 0);
        assert_eq!(s.misses, 0);
    }

    #[test]
    fn clones_share_counters() {
        let m = GatewayMetrics::new();
        let clone = m.clone();
        clone.record_hit();
        clone.record_miss();
        clone.record_miss();
        m.record_persist_failure();
        let s = m.snapshot();
        assert_eq!(s.hits, 1);
        assert_eq!(s.misses, 2);
        assert_eq!(s.persist_failures, 1);
    }

    #[test]
    fn snapshot_serializes() {
        let m = GatewayMetrics::new();
        m.record_index_read_failure();
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["index_read_failures"], 1);
        assert_eq!(json["upstream_errors"], 0);
    }
}
