//! Phonescout HTTP service entry point.
//!
//! Exposes single lookups, CSV batch uploads, run snapshots, SSE progress
//! feeds, and report downloads over an in-memory run registry.

mod api;
mod events;
mod registry;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use phonescout_lookup::{WebDriverLookup, is_webdriver_ready};
use phonescout_shared::{BatchOptions, LookupConfig, load_config};

use crate::api::{AppState, build_app};
use crate::registry::BatchRegistry;

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("phonescout=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = load_config()?;
    let lookup_config = LookupConfig::from(&config);
    let bind_addr = config.server.bind_addr.clone();

    if !is_webdriver_ready(&lookup_config.webdriver_url).await {
        tracing::warn!(
            url = %lookup_config.webdriver_url,
            "WebDriver endpoint not answering; lookups will retry on demand"
        );
    }

    let shutdown = CancellationToken::new();
    let state = AppState {
        lookup: Arc::new(WebDriverLookup::from_config(lookup_config)),
        batch_options: Arc::new(BatchOptions::from(&config)),
        registry: Arc::new(BatchRegistry::default()),
        shutdown: shutdown.clone(),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    Ok(())
}

/// Waits for ctrl-c or SIGTERM, then trips the parent token so in-flight
/// runs stop at their next suspension point.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    shutdown.cancel();
    tracing::info!("received shutdown signal, starting graceful shutdown");
}
