//! Blogsync Watcher binary.
//!
//! Follows the articles named in `BLOGSYNC_ARTICLES` until interrupted.

use std::sync::Arc;

use anyhow::Context;
use blogsync_watcher::{WatcherConfig, WatcherService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,blogsync_watcher=debug,blogsync_sdk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WatcherConfig::from_env().context("invalid watcher configuration")?;

    tracing::info!("Starting Blogsync watcher");
    tracing::info!("Channel URL: {}", config.ws_url);
    tracing::info!("API URL: {}", config.api_url);
    tracing::info!("Articles: {}", config.articles.join(", "));
    if config.token.is_none() {
        tracing::warn!("BLOGSYNC_TOKEN not set, live updates disabled");
    }

    let service = Arc::new(WatcherService::from_config(config)?);

    let signal = Arc::clone(&service);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down watcher");
            signal.stop();
        }
    });

    service.run().await?;
    Ok(())
}
