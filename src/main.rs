//! cidwatch - IPFS manifest digest and blocked-link gateway
//!
//! Serves `POST /processCID`, which lists, digests or link-checks the CIDs
//! referenced by a manifest stored on IPFS.

use cidwatch_core::{run_server, Config};
use std::error::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Parse CLI arguments and environment into config
    let config = Config::from_cli()?;

    init_logging(&config.log_level);

    tracing::info!("Starting cidwatch...");

    run_server(config).await?;

    Ok(())
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
