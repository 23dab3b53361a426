//! # Gateway Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Upstream rejections keep the upstream's own status code. Local failures
//! (storage, index, directory, streaming) become a generic 500 whose body
//! names the failure class; the underlying cause is logged, not returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rpx_upstream::UpstreamError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blob::BlobError;
use crate::directory::DirectoryError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "REPOSITORY_NOT_FOUND").
    pub code: String,
    /// Short human-readable diagnostic.
    pub message: String,
}

/// Request-level failure of the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Repository has no entry in the directory (404).
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    /// Request path could not be routed to a cacheable object (400).
    #[error("invalid request path: {0}")]
    InvalidPath(String),

    /// Probe or fetch transport failure, including timeouts (500).
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Upstream answered the fetch with a status of 400 or above.
    #[error("upstream returned {} {reason}", status.as_u16())]
    UpstreamStatus { status: StatusCode, reason: String },

    /// Local directory or file failure (500).
    #[error("cache storage error: {0}")]
    CacheIo(String),

    /// Metadata store failure that could not be degraded, such as a failed
    /// readiness check (500).
    #[error("metadata store error: {0}")]
    MetadataStore(String),

    /// Repository directory read failure or malformed entry (500).
    #[error("repository directory error: {0}")]
    Directory(String),

    /// Client or blob sink failed mid-copy (500).
    #[error("stream error: {0}")]
    Stream(String),
}

impl GatewayError {
    /// Return the HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::RepositoryNotFound(_) => (StatusCode::NOT_FOUND, "REPOSITORY_NOT_FOUND"),
            Self::InvalidPath(_) => (StatusCode::BAD_REQUEST, "INVALID_PATH"),
            Self::UpstreamUnreachable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_UNREACHABLE")
            }
            Self::UpstreamStatus { status, .. } => (*status, "UPSTREAM_ERROR"),
            Self::CacheIo(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_IO_ERROR"),
            Self::MetadataStore(_) => (StatusCode::INTERNAL_SERVER_ERROR, "METADATA_STORE_ERROR"),
            Self::Directory(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DIRECTORY_ERROR"),
            Self::Stream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STREAM_ERROR"),
        }
    }

    /// Client-facing message. Local failure details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::RepositoryNotFound(_) | Self::InvalidPath(_) | Self::UpstreamStatus { .. } => {
                self.to_string()
            }
            Self::UpstreamUnreachable(_) => "upstream unreachable".to_string(),
            Self::CacheIo(_) => "cache storage error".to_string(),
            Self::MetadataStore(_) => "metadata store error".to_string(),
            Self::Directory(_) => "repository directory error".to_string(),
            Self::Stream(_) => "stream error".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() && !matches!(self, Self::UpstreamStatus { .. }) {
            tracing::error!(error = %self, code, "request failed");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<UpstreamError> for GatewayError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status, reason, .. } => Self::UpstreamStatus {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                reason,
            },
            other => Self::UpstreamUnreachable(other.to_string()),
        }
    }
}

impl From<BlobError> for GatewayError {
    fn from(err: BlobError) -> Self {
        Self::CacheIo(err.to_string())
    }
}

impl From<DirectoryError> for GatewayError {
    fn from(err: DirectoryError) -> Self {
        Self::Directory(err.to_string())
    }
}

impl From<rpx_core::ValidationError> for GatewayError {
    fn from(err: rpx_core::ValidationError) -> Self {
        Self::InvalidPath(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: GatewayError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (GatewayError::RepositoryNotFound("foo".into()), StatusCode::NOT_FOUND),
            (GatewayError::InvalidPath("..".into()), StatusCode::BAD_REQUEST),
            (
                GatewayError::UpstreamUnreachable("refused".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (GatewayError::CacheIo("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                GatewayError::MetadataStore("db".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (GatewayError::Directory("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (GatewayError::Stream("reset".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_code().0, expected, "{err}");
        }
    }

    #[tokio::test]
    async fn upstream_status_is_propagated_verbatim() {
        let err = GatewayError::from(UpstreamError::Status {
            url: "https://example.org/x".into(),
            status: 503,
            reason: "Service Unavailable".into(),
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error.code, "UPSTREAM_ERROR");
        assert_eq!(body.error.message, "upstream returned 503 Service Unavailable");
    }

    #[tokio::test]
    async fn not_found_names_repository() {
        let (status, body) =
            response_parts(GatewayError::RepositoryNotFound("foo".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.code, "REPOSITORY_NOT_FOUND");
        assert!(body.error.message.contains("foo"));
    }

    #[tokio::test]
    async fn cache_io_hides_details() {
        let (status, body) =
            response_parts(GatewayError::CacheIo("/cache/pkgs/a: permission denied".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "CACHE_IO_ERROR");
        assert!(!body.error.message.contains("/cache"), "{}", body.error.message);
    }

    #[tokio::test]
    async fn unreachable_hides_details() {
        let (_, body) =
            response_parts(GatewayError::UpstreamUnreachable("10.0.0.7:443 refused".into())).await;
        assert_eq!(body.error.code, "UPSTREAM_UNREACHABLE");
        assert_eq!(body.error.message, "upstream unreachable");
    }

    #[test]
    fn timeout_maps_to_unreachable() {
        let err = GatewayError::from(UpstreamError::Timeout {
            url: "https://example.org/x".into(),
            secs: 30,
        });
        assert!(matches!(err, GatewayError::UpstreamUnreachable(_)));
    }

    #[test]
    fn validation_error_maps_to_invalid_path() {
        let err = GatewayError::from(rpx_core::ValidationError::EmptyPath);
        assert!(matches!(err, GatewayError::InvalidPath(_)));
    }
}
