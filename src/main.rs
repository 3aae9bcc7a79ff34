//! Webhook Ingress Guard
//!
//! Accepts provider webhook callbacks, verifies that the claimed origin
//! falls inside the provider's published hook IP ranges, and relays
//! verified requests to the configured downstream.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │                 WEBHOOK GUARD                   │
//!                    │                                                 │
//!   Provider POST    │  ┌─────────┐   ┌──────────┐   ┌────────────┐   │
//!   ─────────────────┼─▶│  http   │──▶│ origin   │──▶│ dispatch   │───┼──▶ Downstream
//!                    │  │ server  │   │ verifier │   │ (classify  │   │
//!                    │  └─────────┘   └────┬─────┘   │  + relay)  │   │
//!                    │                     │         └────────────┘   │
//!                    │                     ▼                          │
//!                    │               ┌───────────┐    ┌────────────┐  │
//!                    │               │ allowlist │◀───│ background │  │
//!                    │               │   store   │    │ refresher  │  │
//!                    │               └─────┬─────┘    └─────┬──────┘  │
//!                    │                     │                │         │
//!                    │                     └───── fetch ────┘         │
//!                    │                           │                    │
//!                    └───────────────────────────┼────────────────────┘
//!                                                ▼
//!                                    Provider metadata endpoint
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use webhook_guard::config::loader::load_config;
use webhook_guard::config::GuardConfig;
use webhook_guard::http::HttpServer;
use webhook_guard::lifecycle::signals::wait_for_signal;
use webhook_guard::lifecycle::Shutdown;
use webhook_guard::observability::{logging, metrics};
use webhook_guard::verification;

#[derive(Parser, Debug)]
#[command(name = "webhook-guard", about = "Origin-verifying webhook forwarder")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    logging::init(&config.observability);

    tracing::info!("webhook-guard v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        meta_url = %config.trust.meta_url,
        refresh_interval_secs = config.trust.refresh_interval_secs,
        forward_url = %config.forward.proxy_url,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // The initial snapshot is the one fatal fetch: without it the guard
    // would either trust nothing or have to fail every request open.
    let trust = verification::bootstrap(&config.trust).await?;
    tracing::info!(
        ranges = trust.allowlist.len(),
        "Initial trusted range snapshot loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            shutdown.trigger();
        }
    });

    let server = HttpServer::new(config, trust)?;
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
