//! # Gateway Configuration
//!
//! [`GatewayArgs`] is the command-line and environment surface; it converts
//! into the plain [`GatewayConfig`] the library consumes, so tests can build
//! a config without going through clap.

use std::path::PathBuf;

use clap::Parser;
use rpx_core::RepositoryName;
use rpx_upstream::UpstreamConfig;

use crate::directory::BaseUrl;

/// Runtime configuration of the gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Root directory of the blob store.
    pub cache_dir: PathBuf,
    /// Postgres connection URL. `None` runs with in-memory collaborators.
    pub database_url: Option<String>,
    /// Static repository mappings, used when no database is configured.
    pub repositories: Vec<(RepositoryName, BaseUrl)>,
    /// Upstream connection settings.
    pub upstream: UpstreamConfig,
    /// Fail a MISS with 500 when its blob cannot be written, instead of
    /// serving it uncached.
    pub strict_cache: bool,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("cache_dir", &self.cache_dir)
            .field(
                "database_url",
                &self.database_url.as_deref().map(redact_url),
            )
            .field("repositories", &self.repositories)
            .field("upstream", &self.upstream)
            .field("strict_cache", &self.strict_cache)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            cache_dir: PathBuf::from("/cache"),
            database_url: None,
            repositories: Vec::new(),
            upstream: UpstreamConfig::default(),
            strict_cache: false,
        }
    }
}

/// Replace the userinfo of a connection URL with `[REDACTED]`.
fn redact_url(raw: &str) -> String {
    match (raw.find("://"), raw.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}[REDACTED]{}", &raw[..scheme_end + 3], &raw[at..])
        }
        _ => raw.to_string(),
    }
}

/// Caching gateway for upstream content repositories.
#[derive(Parser, Debug)]
#[command(name = "repoproxy", version, about)]
pub struct GatewayArgs {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Root directory for cached blobs.
    #[arg(long, env = "CACHE_DIR", default_value = "/cache")]
    pub cache_dir: PathBuf,

    /// Postgres URL for the repository directory and metadata index.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Static repository mapping as NAME=URL. Repeatable.
    #[arg(long = "repository", env = "REPOSITORIES", value_delimiter = ',', value_parser = parse_mapping)]
    pub repositories: Vec<(RepositoryName, BaseUrl)>,

    /// Seconds to wait for upstream response headers.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = rpx_upstream::config::DEFAULT_TIMEOUT_SECS)]
    pub upstream_timeout_secs: u64,

    /// Seconds to wait for an upstream connection.
    #[arg(long, env = "UPSTREAM_CONNECT_TIMEOUT_SECS", default_value_t = rpx_upstream::config::DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub upstream_connect_timeout_secs: u64,

    /// Fail requests whose blob cannot be cached instead of serving them uncached.
    #[arg(long, env = "STRICT_CACHE")]
    pub strict_cache: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl From<GatewayArgs> for GatewayConfig {
    fn from(args: GatewayArgs) -> Self {
        Self {
            port: args.port,
            cache_dir: args.cache_dir,
            database_url: args.database_url,
            repositories: args.repositories,
            upstream: UpstreamConfig {
                timeout_secs: args.upstream_timeout_secs,
                connect_timeout_secs: args.upstream_connect_timeout_secs,
                ..UpstreamConfig::default()
            },
            strict_cache: args.strict_cache,
        }
    }
}

/// Parse a `NAME=URL` repository mapping.
fn parse_mapping(raw: &str) -> Result<(RepositoryName, BaseUrl), String> {
    let (name, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got {raw:?}"))?;
    let name = RepositoryName::new(name.trim()).map_err(|e| e.to_string())?;
    let url = BaseUrl::parse(url).map_err(|e| format!("invalid URL for {name}: {e}"))?;
    Ok((name, url))
}
