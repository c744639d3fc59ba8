//! # Auction Runtime
//!
//! Entry point: arbitration engine, scheduler and notification relay in one
//! process, sharing an in-memory event bus.
//!
//! ## Environment
//!
//! - `AUCTION_LOG_LEVEL` / `RUST_LOG` - log filter (default `info`)
//! - `AUCTION_*` - see [`auction_runtime::RuntimeConfig`]

use anyhow::Result;
use auction_runtime::{load_config, AuctionRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = match std::env::var("AUCTION_LOG_LEVEL") {
        Ok(level) => EnvFilter::new(level),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;

    let mut runtime = AuctionRuntime::new(config);
    runtime.start().await?;

    info!("Auction services running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
