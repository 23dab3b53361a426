//! # Freshness Validator
//!
//! Probes the upstream, reads the metadata index, checks the blob store, and
//! hands the three observations to [`rpx_core::classify`].
//!
//! A failed index read is not an error for the client. It is logged, counted,
//! and classified as `MISS (index_unavailable)` so the request proceeds to a
//! full fetch.

use rpx_core::{classify, Freshness, IndexLookup};
use rpx_upstream::Probe;

use crate::error::GatewayError;
use crate::routing::RoutedRequest;
use crate::state::AppState;

/// Probe result and its classification.
#[derive(Debug, Clone)]
pub struct Validation {
    pub probe: Probe,
    pub freshness: Freshness,
}

/// Decide whether `routed` can be served from the blob store.
///
/// Fails only when the upstream probe fails.
pub async fn validate(state: &AppState, routed: &RoutedRequest) -> Result<Validation, GatewayError> {
    let probe = state.upstream.probe(&routed.target).await.map_err(|e| {
        state.metrics.record_upstream_error();
        tracing::warn!(target_url = %routed.target, error = %e, "upstream probe failed");
        GatewayError::UpstreamUnreachable(e.to_string())
    })?;

    let stored = match state.index.get(&routed.repository, &routed.path).await {
        Ok(stored) => Ok(stored),
        Err(e) => {
            state.metrics.record_index_read_failure();
            tracing::warn!(
                repository = %routed.repository,
                path = %routed.path,
                error = %e,
                "metadata index read failed; treating as miss"
            );
            Err(e)
        }
    };

    let (lookup, blob_present) = match &stored {
        Ok(Some(descriptor)) => (
            IndexLookup::Found(&descriptor.fingerprint),
            state.blobs.exists(&routed.repository, &routed.path).await,
        ),
        Ok(None) => (IndexLookup::Absent, false),
        Err(_) => (IndexLookup::Unavailable, false),
    };

    let freshness = classify(lookup, &probe.fingerprint, blob_present);
    let reason = match freshness {
        Freshness::Miss(reason) => reason.as_str(),
        Freshness::Hit => "",
    };
    tracing::debug!(
        repository = %routed.repository,
        path = %routed.path,
        freshness = freshness.as_str(),
        reason,
        "classified request"
    );

    Ok(Validation { probe, freshness })
}
