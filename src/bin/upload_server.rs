//! Upload service - Entry Point
//!
//! Loads configuration, initializes logging and serves the upload API.

use video_host::{config::Config, init_logging, run_upload_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load_default()?;

    // Initialize logging
    init_logging(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting video upload server"
    );

    run_upload_server(config).await
}
