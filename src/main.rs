//! Storefront proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                  STOREFRONT PROXY                     │
//!   Client Request   │  ┌────────┐   ┌──────────┐   ┌────────────────────┐  │
//!   ─────────────────┼─▶│  http  │──▶│ routing  │──▶│ upstream           │  │
//!                    │  │ server │   │ classify │   │ build → redirects  │──┼──▶ Storefront
//!                    │  └────────┘   └──────────┘   │ → not-found guard  │◀─┼─── Upstream
//!                    │       ▲                      └─────────┬──────────┘  │
//!   Client Response  │  ┌────┴──────────────────┐             │             │
//!   ◀────────────────┼──│ rewrite (headers,HTML)│◀────────────┘             │
//!                    │  └───────────────────────┘                           │
//!                    │  config · observability · lifecycle · security       │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storefront_proxy::config::load_settings;
use storefront_proxy::lifecycle::signals::spawn_signal_handler;
use storefront_proxy::observability::{logging, metrics};
use storefront_proxy::{HttpServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "storefront-proxy", version, about = "Transparent reverse proxy for a hosted storefront")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address (e.g. 0.0.0.0:8080).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        settings.listener.bind_address = bind;
    }

    logging::init_tracing(&settings.observability.log_level);
    tracing::info!("storefront-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %settings.listener.bind_address,
        upstream = settings.upstream.override_origin.as_deref().or(settings.upstream.origin.as_deref()).unwrap_or("<unset>"),
        document_policy = ?settings.upstream.document_policy,
        request_timeout_secs = settings.timeouts.request_secs,
        "Configuration loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(&settings);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
