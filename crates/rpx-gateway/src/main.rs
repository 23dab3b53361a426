//! # repoproxy — Binary Entry Point
//!
//! Parses configuration, connects the optional database, and serves the
//! gateway router with peer addresses attached to each request.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use rpx_gateway::config::{GatewayArgs, GatewayConfig};
use rpx_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = GatewayArgs::parse();
    init_tracing(args.log_json);

    let config = GatewayConfig::from(args);
    tracing::info!(?config, "starting repoproxy");

    // Database is optional; absent means in-memory index and static directory.
    let db_pool = match config.database_url.as_deref() {
        Some(url) => Some(
            rpx_gateway::db::init_pool(url)
                .await
                .context("database initialization failed")?,
        ),
        None => {
            tracing::warn!("no database configured; cache descriptors will not survive restarts");
            None
        }
    };

    tokio::fs::create_dir_all(&config.cache_dir)
        .await
        .with_context(|| format!("cannot create cache directory {}", config.cache_dir.display()))?;

    let port = config.port;
    let state = AppState::from_config(config, db_pool).context("failed to build upstream client")?;
    let app = rpx_gateway::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!(%addr, "repoproxy listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
