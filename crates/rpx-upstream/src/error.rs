//! Upstream client error types.

/// Errors from upstream probe and fetch calls.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Transport failure: DNS, connect, TLS, or a broken response.
    #[error("HTTP error calling {url}: {source}")]
    Transport { url: String, source: reqwest::Error },
    /// No response headers, or no body chunk, within the configured timeout.
    #[error("timed out after {secs}s waiting for {url}")]
    Timeout { url: String, secs: u64 },
    /// Upstream answered a full fetch with a status of 400 or above.
    #[error("upstream {url} returned {status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientInit(reqwest::Error),
}
