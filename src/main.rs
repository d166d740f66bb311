//! Product lookup gateway.
//!
//! Validates product lookups, forwards them to the Omie inventory API and
//! returns a uniform envelope.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                   PRODUCT GATEWAY                    │
//!                     │                                                      │
//!   Client Request    │  ┌───────────┐   ┌────────────┐   ┌──────────────┐  │
//!   ──────────────────┼─▶│ request id│──▶│ rate limit │──▶│ content type │  │
//!                     │  │  + trace  │   │ (per IP)   │   │  + size      │  │
//!                     │  └───────────┘   └────────────┘   └──────┬───────┘  │
//!                     │                                          │          │
//!                     │                                          ▼          │
//!                     │  ┌───────────┐   ┌────────────┐   ┌──────────────┐  │
//!                     │  │ envelope  │◀──│  upstream  │◀──│  sanitize +  │  │
//!   ◀─────────────────┼──│ (success/ │   │  client    │   │  validation  │  │
//!   Client Response   │  │  error)   │   └─────┬──────┘   └──────────────┘  │
//!                     │  └───────────┘         │                            │
//!                     └────────────────────────┼────────────────────────────┘
//!                                              ▼
//!                                      Omie inventory API
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use product_gateway::config::load_from_env;
use product_gateway::http::HttpServer;
use product_gateway::lifecycle::{wait_for_signal, Shutdown};
use product_gateway::observability::{init_logging, metrics};
use product_gateway::upstream::OmieClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_from_env()?;
    init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "product-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        rate_limit_enabled = config.rate_limit.enabled,
        rate_limit_window_ms = config.rate_limit.window_ms,
        rate_limit_max_requests = config.rate_limit.max_requests,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let client = Arc::new(OmieClient::new(&config.upstream)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config, client);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
