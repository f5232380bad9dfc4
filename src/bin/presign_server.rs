//! Presign service - Entry Point
//!
//! Loads configuration, initializes logging and serves the presign API
//! together with the static landing page.

use video_host::{config::Config, init_logging, run_presign_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_default()?;

    init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bucket = config.presign.bucket.as_deref().unwrap_or("<unset>"),
        "Starting presign server"
    );

    run_presign_server(config).await
}
