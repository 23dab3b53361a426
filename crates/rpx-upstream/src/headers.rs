//! Extraction of freshness validators from upstream response headers.
//!
//! Missing headers read as empty strings. A missing or unparsable
//! `Content-Length` reads as `None`; callers decide whether that means 0
//! (probe) or "use the probe's value" (fetch).

use reqwest::header::{HeaderMap, HeaderName, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use rpx_core::Fingerprint;

/// Content type used when the upstream does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Parse `Content-Length`, if present and a valid integer.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// `Content-Type`, or [`DEFAULT_CONTENT_TYPE`] when absent or empty.
pub fn content_type(headers: &HeaderMap) -> String {
    match header_str(headers, &CONTENT_TYPE) {
        "" => DEFAULT_CONTENT_TYPE.to_string(),
        value => value.to_string(),
    }
}

/// Build a fingerprint from `Last-Modified`, `ETag` and the given size.
pub fn fingerprint(headers: &HeaderMap, file_size: u64) -> Fingerprint {
    Fingerprint::new(
        header_str(headers, &LAST_MODIFIED),
        file_size,
        header_str(headers, &ETAG),
    )
}
