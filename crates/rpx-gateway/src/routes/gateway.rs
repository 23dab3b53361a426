//! # Gateway Route
//!
//! `GET /<repository>/<path...>` runs the per-request state machine:
//!
//! ```text
//! START → ROUTED → PROBED → HIT  → SERVED
//!                         → MISS → FETCHING → STREAMED → PERSISTED | PERSIST_FAILED
//!                                           → FETCH_FAILED
//! ```
//!
//! Nothing is retried within a request.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use rpx_core::{Freshness, MissReason};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::GatewayError;
use crate::pipeline::{self, X_CACHE};
use crate::routing::{self, RoutedRequest};
use crate::state::AppState;
use crate::validator::{self, Validation};

/// Build the gateway router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{*path}", get(serve))
}

async fn serve(State(state): State<AppState>, request: Request) -> Result<Response, GatewayError> {
    let raw_path = request.uri().path().to_owned();
    let routed = routing::route(&state, &raw_path).await?;
    let Validation { probe, freshness } = validator::validate(&state, &routed).await?;

    let reason = match freshness {
        Freshness::Hit => match serve_cached(&state, &routed, request).await {
            Some(response) => {
                state.metrics.record_hit();
                return Ok(response);
            }
            None => MissReason::BlobMissing,
        },
        Freshness::Miss(reason) => {
            tracing::info!(
                client = %client_address(request.headers(), connect_info(&request)),
                repository = %routed.repository,
                path = %routed.path,
                reason = reason.as_str(),
                "cache miss"
            );
            reason
        }
    };

    state.metrics.record_miss();
    tracing::debug!(target_url = %routed.target, reason = reason.as_str(), "fetching from upstream");
    pipeline::fetch_and_store(&state, routed, probe).await
}

/// Serve a finalized blob with conditional-request support.
///
/// Returns `None` when the blob disappeared after the freshness check, so the
/// caller can fall back to a fetch.
async fn serve_cached(state: &AppState, routed: &RoutedRequest, request: Request) -> Option<Response> {
    let path = state.blobs.blob_path(&routed.repository, &routed.path);
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    if response.status() == StatusCode::NOT_FOUND {
        tracing::warn!(
            repository = %routed.repository,
            path = %routed.path,
            "blob vanished after freshness check; refetching"
        );
        return None;
    }

    let mut response = response.map(Body::new);
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static("HIT"));
    Some(response)
}

fn connect_info(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Originating client: the first `X-Forwarded-For` entry, else the peer.
fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    match (forwarded, peer) {
        (Some(forwarded), _) => forwarded.to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:51234".parse().unwrap())
    }

    #[test]
    fn forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(client_address(&headers, peer()), "203.0.113.5");
    }

    #[test]
    fn falls_back_to_peer_address() {
        assert_eq!(client_address(&HeaderMap::new(), peer()), "192.0.2.10");
    }

    #[test]
    fn empty_forwarded_for_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" "));
        assert_eq!(client_address(&headers, peer()), "192.0.2.10");
    }

    #[test]
    fn unknown_without_any_source() {
        assert_eq!(client_address(&HeaderMap::new(), None), "unknown");
    }
}
