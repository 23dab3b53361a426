//! Upstream client configuration.
//!
//! Every outbound request is bounded: the connect phase by
//! `connect_timeout_secs`, and both the wait for response headers and each
//! individual body read by `timeout_secs`. The body as a whole has no
//! deadline, so large artifacts that keep flowing are never cut off.

use std::time::Duration;

/// Default wait for upstream response headers, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default TCP/TLS connect timeout, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration for connecting to upstream repositories.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Wait for response headers, and for each body chunk, in seconds.
    pub timeout_secs: u64,
    /// Connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// `User-Agent` sent upstream.
    pub user_agent: String,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: concat!("repoproxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
