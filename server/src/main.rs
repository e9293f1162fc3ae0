//! Rates dashboard binary.
//!
//! Run with:
//! ```bash
//! RUST_LOG=info rate-server --listen 0.0.0.0:8080 --retention-count 20
//! ```

use anyhow::Result;
use clap::Parser;
use rate_server::config::Args;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rate_server=info,rate_sampler=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();

    info!("Starting rate server");
    info!("  Listen: {}", args.listen);
    info!("  Fiat provider: {:?}", args.fiat_provider);
    info!("  Crypto provider: {:?}", args.crypto_provider);

    rate_server::run(args).await
}
