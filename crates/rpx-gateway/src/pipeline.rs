//! # Fetch-and-Store Pipeline
//!
//! The MISS path. A full `GET` is issued upstream and its body is copied in
//! one pass to both the client and a [`BlobWriter`]:
//!
//! ```text
//! upstream ──► tee task ──► BlobWriter (.staging/<uuid>.part)
//!                  │
//!                  └──► mpsc ──► response body
//! ```
//!
//! Each chunk is written to the blob before it is forwarded, so the client
//! never receives bytes the cache did not. When the body is complete the blob
//! is finalized (renamed into place) and then the descriptor is upserted.
//! Both steps run under the key's [`PublishLocks`] entry, so concurrent
//! fetches of one key publish one at a time and the last rename is always
//! paired with the last upsert.
//!
//! Failure handling inside the tee task:
//!
//! - Upstream read failure, a read that stalls past the upstream timeout, a
//!   body shorter than its `Content-Length`, or a blob write failure: the
//!   client body ends with an error and the staging file is discarded.
//!   Nothing is published.
//! - Client disconnect: the task keeps reading upstream, then finalizes and
//!   persists, so the next request can be a HIT.
//! - Persist failure: logged and counted. The client already has its bytes,
//!   and the next request re-fetches.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use rpx_core::{CachePath, Fingerprint, RepositoryName};
use rpx_upstream::{Probe, DEFAULT_CONTENT_TYPE};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::blob::BlobWriter;
use crate::error::GatewayError;
use crate::index::MetadataIndex;
use crate::middleware::metrics::GatewayMetrics;
use crate::publish::PublishLocks;
use crate::routing::RoutedRequest;
use crate::state::AppState;

/// Response header carrying the freshness classification.
pub const X_CACHE: &str = "x-cache";

const CHANNEL_CAPACITY: usize = 32;

/// Fetch `routed` from upstream, stream it to the client, and cache it.
pub async fn fetch_and_store(
    state: &AppState,
    routed: RoutedRequest,
    probe: Probe,
) -> Result<Response, GatewayError> {
    let fetched = state.upstream.fetch(&routed.target).await.map_err(|e| {
        state.metrics.record_upstream_error();
        tracing::warn!(target_url = %routed.target, error = %e, "upstream fetch failed");
        GatewayError::from(e)
    })?;

    let content_length = fetched.content_length();
    let fingerprint = fetched.fingerprint(&probe.fingerprint);

    let writer = match state.blobs.open_for_write(&routed.repository, &routed.path).await {
        Ok(writer) => writer,
        Err(e) if state.config.strict_cache => return Err(e.into()),
        Err(e) => {
            state.metrics.record_uncached_serve();
            tracing::warn!(
                repository = %routed.repository,
                path = %routed.path,
                error = %e,
                "cache preparation failed; serving uncached"
            );
            let body = Body::from_stream(fetched.into_body_stream());
            return Ok(miss_response(&probe.content_type, content_length, body));
        }
    };

    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(CHANNEL_CAPACITY);
    let job = TeeJob {
        repository: routed.repository,
        path: routed.path,
        fingerprint,
        expected_len: content_length,
        index: Arc::clone(&state.index),
        locks: state.publish_locks.clone(),
        metrics: state.metrics.clone(),
    };
    tokio::spawn(job.run(fetched.into_body_stream(), writer, tx));

    let body = Body::from_stream(ReceiverStream::new(rx));
    Ok(miss_response(&probe.content_type, content_length, body))
}

fn miss_response(content_type: &str, content_length: Option<u64>, body: Body) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    if let Some(len) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
    response
}

/// Everything the tee task needs once the request handler has returned.
struct TeeJob {
    repository: RepositoryName,
    path: CachePath,
    fingerprint: Fingerprint,
    expected_len: Option<u64>,
    index: Arc<dyn MetadataIndex>,
    locks: PublishLocks,
    metrics: GatewayMetrics,
}

impl TeeJob {
    async fn run<S, E>(
        self,
        upstream: S,
        mut writer: BlobWriter,
        tx: mpsc::Sender<Result<Bytes, io::Error>>,
    ) where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display + Send,
    {
        let mut upstream = std::pin::pin!(upstream);
        let mut client_connected = true;

        while let Some(next) = upstream.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.abort(&tx, format!("upstream body read failed: {e}"))
                        .await;
                    return;
                }
            };

            if let Err(e) = writer.write(&chunk).await {
                self.abort(&tx, e.to_string()).await;
                return;
            }

            if client_connected && tx.send(Ok(chunk)).await.is_err() {
                client_connected = false;
                tracing::info!(
                    repository = %self.repository,
                    path = %self.path,
                    "client disconnected; completing cache write"
                );
            }
        }

        if let Some(expected) = self.expected_len {
            if writer.written() != expected {
                let message = format!(
                    "upstream body ended after {} of {expected} bytes",
                    writer.written()
                );
                self.abort(&tx, message).await;
                return;
            }
        }

        let publishing = self.locks.acquire(&self.repository, &self.path).await;

        let bytes = match writer.finalize().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    repository = %self.repository,
                    path = %self.path,
                    error = %e,
                    "failed to publish cached blob"
                );
                return;
            }
        };

        match self
            .index
            .upsert(&self.repository, &self.path, &self.fingerprint)
            .await
        {
            Ok(_) => tracing::info!(
                repository = %self.repository,
                path = %self.path,
                bytes,
                "cached blob"
            ),
            Err(e) => {
                self.metrics.record_persist_failure();
                tracing::error!(
                    repository = %self.repository,
                    path = %self.path,
                    error = %e,
                    "failed to persist cache descriptor"
                );
            }
        }
        drop(publishing);

        // The client body ends only after the descriptor write has settled.
        drop(tx);
    }

    /// End the client body with an error. The dropped writer discards its
    /// staging file.
    async fn abort(&self, tx: &mpsc::Sender<Result<Bytes, io::Error>>, message: String) {
        let err = GatewayError::Stream(message);
        tracing::error!(
            repository = %self.repository,
            path = %self.path,
            error = %err,
            "stream copy aborted"
        );
        let _ = tx.send(Err(io::Error::other(err))).await;
    }
}
