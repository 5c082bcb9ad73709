//! Regional API server.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────────┐
//!                          │                    REGIONAL API                       │
//!                          │                                                       │
//!   Client Request         │  ┌──────────┐   ┌────────────────────────────────┐    │
//!   ───────────────────────┼─▶│   http   │──▶│     authorization pipeline     │    │
//!                          │  │  server  │   │ rate limit → route → credential│    │
//!                          │  └──────────┘   └───────────────┬────────────────┘    │
//!                          │                      Reject     │    Admit(identity?) │
//!   401 / 429              │                 ◀───────────────┤                     │
//!   ◀──────────────────────┼─────────────────                 ▼                     │
//!                          │                         ┌──────────────┐              │
//!   200 / 201 / 404        │                         │ api handlers │              │
//!   ◀──────────────────────┼─────────────────────────│  + catalog   │              │
//!                          │                         └──────────────┘              │
//!                          │  ┌──────────────────────────────────────────────────┐ │
//!                          │  │ config · observability · lifecycle (shutdown)    │ │
//!                          │  └──────────────────────────────────────────────────┘ │
//!                          └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use regional_api::config::load_config;
use regional_api::http::HttpServer;
use regional_api::lifecycle::{signals, Shutdown};
use regional_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "regional-api")]
#[command(about = "Regional and artist administration API", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration errors are fatal before anything binds
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("regional-api v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        rate_limit = config.rate_limit.limit,
        rate_window_secs = config.rate_limit.window_secs,
        route_rules = config.routes.rules.len(),
        users = config.auth.users.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::trigger_on_signal(shutdown.clone());

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            server.run_tls(addr, &tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
