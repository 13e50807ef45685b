use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use teamalert_server::store::{JsonFileStore, MessageStore, StoreRead};
use teamalert_server::transport::YubotoTransport;
use teamalert_server::{serve, AppState, Cli};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config();
    if config.api_key.is_none() {
        warn!("YUBOTO_API_KEY is not set; sends will be logged as failed");
    }

    let store = JsonFileStore::new(config.log_path());
    match store.read().await {
        StoreRead::Loaded(records) => {
            info!(path = %store.path().display(), records = records.len(), "message log loaded")
        }
        StoreRead::Missing => info!(path = %store.path().display(), "no message log yet"),
        StoreRead::Unreadable(reason) => {
            warn!(path = %store.path().display(), %reason, "message log unreadable; sends will fail until it is fixed")
        }
        StoreRead::Corrupt(reason) => {
            warn!(path = %store.path().display(), %reason, "message log corrupt; it will be moved aside on the next send")
        }
    }

    let transport = YubotoTransport::from_config(&config).context("failed to build SMS client")?;
    let listen = config.listen;
    info!(sender = %config.sender, base_url = %config.public_base_url, "configuration loaded");

    let state = AppState::new(config, Arc::new(store), Arc::new(transport));
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!("teamalert listening on {}", listen);

    serve(listener, state, shutdown_signal())
        .await
        .context("server failed")
}
