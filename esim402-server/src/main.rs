//! x402 eSIM storefront HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p esim402-server --release
//!
//! # Run with custom config path
//! esim402-server --config /path/to/config.toml
//!
//! # Configure logging level
//! RUST_LOG=debug esim402-server
//! ```
//!
//! A `.env` file in the working directory is loaded before configuration.
//! See [`esim402_server::config`] for the recognised variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use esim402::usage::WebhookVerifier;
use esim402_http::server::{FulfillmentClient, Paygate};
use tracing_subscriber::EnvFilter;

use esim402_server::config::StoreConfig;
use esim402_server::{AppState, store_router};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    // .env must be loaded before clap reads CONFIG
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("Storefront failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig::load_from(&cli.config)?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        provider = %config.provider.api_url,
        network = %config.payment.network,
        "Loaded configuration"
    );

    if config.payment.recipient.is_empty() {
        tracing::warn!("X402_PAYMENT_ADDRESS not set; challenges will carry an empty recipient");
    }
    let verifier = WebhookVerifier::new(config.webhook.secret.as_deref());
    if !verifier.is_enforcing() {
        tracing::warn!("WEBHOOK_SECRET not set; usage webhooks are accepted unsigned");
    }

    let fulfillment = FulfillmentClient::try_new(&config.provider.api_url, &config.provider.api_key)
        .map_err(|e| format!("Invalid provider configuration: {e}"))?
        .with_timeout(config.upstream_timeout());

    let state = AppState::new(
        Arc::new(fulfillment),
        Paygate::new(config.payment.recipient.clone()),
        verifier,
        config.payment.network,
    );
    let app = store_router(Arc::new(state));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Storefront listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Storefront shut down gracefully");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM (Unix) to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            tracing::warn!("Failed to install SIGTERM handler, listening for Ctrl-C only");
            let _ = ctrl_c.await;
            return;
        };
        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down..."),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        if ctrl_c.await.is_ok() {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }
}
