//! Serves the built-in action providers over HTTP.
//!
//! Reads configuration from the environment (and `.env`), connects an
//! alloy-backed wallet, and runs the action API until Ctrl-C.

mod config;

use std::sync::Arc;

use actionkit_http_api::{build_router, ActionApiState};
use actionkit_runtime::{ChainWallet, ProviderRegistry, WalletPort};

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_log();

    let config = AppConfig::from_env()?;
    let wallet = ChainWallet::from_config(&config.runtime)?;
    tracing::info!(
        "Wallet {} on {} via {}",
        wallet.address(),
        config.runtime.network,
        config.runtime.rpc_url
    );

    let registry = ProviderRegistry::with_builtins();
    let available = registry.actions(&config.runtime.network);
    if available.is_empty() {
        tracing::warn!(
            "No provider supports {}; every invocation will be rejected",
            config.runtime.network
        );
    } else {
        tracing::info!("{} actions available", available.len());
    }

    let state = Arc::new(ActionApiState {
        registry,
        wallet: Arc::new(wallet),
        network: config.runtime.network.clone(),
        api_token: config.api_token,
    });

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("Action API listening on {}", config.bind);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Action API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}
