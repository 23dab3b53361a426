//! # rpx-upstream — Typed Client for Upstream Repositories
//!
//! Two calls, matching the two upstream touches of a gateway request:
//!
//! - [`UpstreamClient::probe`] issues a `HEAD` and returns the validators
//!   the freshness check compares. The probe's status is not inspected.
//! - [`UpstreamClient::fetch`] issues a `GET` and hands back the response
//!   with its body still unread, so the caller can stream it. Statuses of
//!   400 and above become [`UpstreamError::Status`].
//!
//! Neither call retries. A transport failure or timeout is reported once
//! and the gateway fails the request. The configured timeout bounds the wait
//! for response headers and, separately, every read of a fetched body, so a
//! stalled upstream cannot hold a stream open indefinitely.

pub mod config;
pub mod error;
pub mod headers;

pub use config::UpstreamConfig;
pub use error::UpstreamError;
pub use headers::DEFAULT_CONTENT_TYPE;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use rpx_core::Fingerprint;
use std::time::Duration;
use url::Url;

/// Result of a header-only probe.
#[derive(Debug, Clone)]
pub struct Probe {
    /// Validators; size is 0 when `Content-Length` is absent or unparsable.
    pub fingerprint: Fingerprint,
    /// Declared content type, defaulted when absent.
    pub content_type: String,
}

/// A successful (status < 400) full fetch whose body has not been read.
#[derive(Debug)]
pub struct Fetched {
    response: reqwest::Response,
    url: String,
    read_timeout: Duration,
}

impl Fetched {
    /// Declared body length, if the upstream sent a valid `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        headers::content_length(self.response.headers())
    }

    /// Validators to persist once the body has been stored.
    ///
    /// Size comes from this response's `Content-Length`, falling back to
    /// the probe's size only when the header is missing.
    pub fn fingerprint(&self, probe: &Fingerprint) -> Fingerprint {
        let size = self.content_length().unwrap_or_else(|| probe.file_size());
        headers::fingerprint(self.response.headers(), size)
    }

    /// Consume the response as a stream of body chunks.
    ///
    /// A read that yields nothing within the client timeout ends the stream
    /// with [`UpstreamError::Timeout`].
    pub fn into_body_stream(self) -> impl Stream<Item = Result<Bytes, UpstreamError>> + Send {
        let Self {
            response,
            url,
            read_timeout,
        } = self;
        tokio_stream::StreamExt::timeout(response.bytes_stream(), read_timeout).map(move |item| {
            match item {
                Ok(Ok(chunk)) => Ok(chunk),
                Ok(Err(source)) => Err(UpstreamError::Transport {
                    url: url.clone(),
                    source,
                }),
                Err(_) => Err(UpstreamError::Timeout {
                    url: url.clone(),
                    secs: read_timeout.as_secs(),
                }),
            }
        })
    }
}

/// HTTP client for upstream repository requests.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl UpstreamClient {
    /// Create a client from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(UpstreamError::ClientInit)?;

        Ok(Self {
            http,
            timeout: config.timeout(),
        })
    }

    /// Header-only probe of `url`.
    pub async fn probe(&self, url: &Url) -> Result<Probe, UpstreamError> {
        let response = self.send(self.http.head(url.clone()), url).await?;
        let headers = response.headers();
        let probe = Probe {
            fingerprint: headers::fingerprint(headers, headers::content_length(headers).unwrap_or(0)),
            content_type: headers::content_type(headers),
        };
        tracing::debug!(
            url = %url,
            status = response.status().as_u16(),
            last_modified = probe.fingerprint.last_modified(),
            size = probe.fingerprint.file_size(),
            etag = probe.fingerprint.etag(),
            "upstream probe"
        );
        Ok(probe)
    }

    /// Full fetch of `url`. The body is left unread.
    pub async fn fetch(&self, url: &Url) -> Result<Fetched, UpstreamError> {
        let response = self.send(self.http.get(url.clone()), url).await?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                reason: reason_phrase(&response, status),
            });
        }
        Ok(Fetched {
            response,
            url: url.to_string(),
            read_timeout: self.timeout,
        })
    }

    /// Send a request, bounding the wait for response headers.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<reqwest::Response, UpstreamError> {
        match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(source)) => Err(UpstreamError::Transport {
                url: url.to_string(),
                source,
            }),
            Err(_) => Err(UpstreamError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

/// The reason phrase the upstream sent, or the canonical one for `status`
/// when the wire phrase was standard or absent.
fn reason_phrase(response: &reqwest::Response, status: StatusCode) -> String {
    match response.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => status.canonical_reason().unwrap_or("").to_string(),
    }
}
