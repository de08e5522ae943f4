//! soulgrid server
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                      SOULGRID                        │
//!                      │                                                      │
//!   Client Request     │  ┌──────────┐   ┌───────────┐   ┌──────────────┐     │
//!   ───────────────────┼─▶│   rate   │──▶│   soul    │──▶│ compression  │     │
//!                      │  │  limiter │   │ assignment│   │  + handlers  │     │
//!                      │  └────┬─────┘   └─────┬─────┘   └──────┬───────┘     │
//!                      │       │ 429           │                │             │
//!                      │       ▼               ▼                ▼             │
//!                      │  in-memory       ┌───────────────────────────┐       │
//!                      │  windows         │  SQLite (souls, pixels)   │       │
//!                      │  + sweeper       └───────────────────────────┘       │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use soulgrid::config::{load_config, ServerConfig};
use soulgrid::lifecycle::{spawn_signal_listener, Shutdown};
use soulgrid::observability::{logging, metrics};
use soulgrid::{Database, HttpServer};

#[derive(Parser)]
#[command(name = "soulgrid")]
#[command(about = "Anonymous shared pixel grid server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("soulgrid v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        database = %config.database.path,
        quota = config.grid.quota,
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let db = Database::open(config.database.path.as_ref())?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config, db);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
