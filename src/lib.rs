//! # Video Host Server
//!
//! Two small, independently deployable HTTP services for getting videos
//! online.
//!
//! ## Services
//!
//! - **Upload service** (`upload-server`): accepts multipart video uploads,
//!   checks declared type and size, stores them under a generated name,
//!   serves them back and deletes them on request
//! - **Presign service** (`presign-server`): issues short-lived S3 `PUT`
//!   URLs so clients upload straight to the bucket
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │        Upload service        │   │       Presign service        │
//! │  ┌──────────┐ ┌───────────┐  │   │  ┌──────────┐ ┌───────────┐  │
//! │  │ Upload   │ │ Serve /   │  │   │  │ Presign  │ │ Static    │  │
//! │  │ API      │ │ Delete    │  │   │  │ API      │ │ public/   │  │
//! │  └──────────┘ └───────────┘  │   │  └──────────┘ └───────────┘  │
//! ├──────────────────────────────┤   ├──────────────────────────────┤
//! │  Admission   │   Storage     │   │        ObjectSigner          │
//! ├──────────────────────────────┤   ├──────────────────────────────┤
//! │     uploads/ + uploads.tmp/  │   │     S3 (SigV4, signed only)  │
//! └──────────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Upload service
//! cargo run --release --bin upload-server
//! curl -X POST http://localhost:3000/upload -F "video=@clip.mp4;type=video/mp4"
//!
//! # Presign service
//! BUCKET=clips AWS_REGION=us-east-1 cargo run --release --bin presign-server
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

pub use config::{Config, LoggingConfig};
pub use error::{AppError, Result};
pub use state::{PresignState, UploadState};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Room left in the request body limit for multipart boundaries and headers
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Run the upload service with the given configuration.
pub async fn run_upload_server(config: Config) -> anyhow::Result<()> {
    let addr = bind_address(&config)?;

    // Creates uploads/ and the staging directory once, up front
    let state = UploadState::new(config).await?;
    let app = create_upload_router(state);

    info!(address = %addr, "Upload server starting");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run the presign service with the given configuration.
pub async fn run_presign_server(config: Config) -> anyhow::Result<()> {
    let addr = bind_address(&config)?;

    let state = PresignState::new(config);
    let app = create_presign_router(state);

    info!(address = %addr, "Presign server starting");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the upload service router
pub fn create_upload_router(state: UploadState) -> Router {
    // The size ceiling is enforced while streaming; this only stops bodies
    // that cannot possibly fit
    let max_size = state.policy.max_size();
    let body_limit = RequestBodyLimitLayer::new(
        max_size
            .saturating_add(MULTIPART_OVERHEAD)
            .try_into()
            .unwrap_or(usize::MAX),
    );

    info!(
        max_upload_size = max_size,
        upload_dir = %state.storage.upload_dir().display(),
        "Upload admission configured"
    );

    Router::new()
        .merge(handlers::upload_routes())
        .nest("/uploads", handlers::serve_routes())
        .nest("/health", handlers::health_routes())
        .layer(cors())
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit)
        .layer(middleware::map_response_with_state(
            max_size,
            body_limit_rejection,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rewrite the body limit layer's plain-text 413 into the `FileTooLarge`
/// JSON error handlers return
async fn body_limit_rejection(State(max_size): State<u64>, response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return AppError::FileTooLarge { max: max_size }.into_response();
    }

    response
}

/// Create the presign service router
///
/// Everything that is not an API route is served from the public directory,
/// with `index.html` as the landing page at `/`.
pub fn create_presign_router(state: PresignState) -> Router {
    let public_dir = state.config.presign.public_dir.clone();

    Router::new()
        .merge(handlers::presign_routes())
        .nest("/health", handlers::health_routes())
        .route_service("/", ServeFile::new(public_dir.join("index.html")))
        .fallback_service(ServeDir::new(&public_dir))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize logging based on configuration
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn bind_address(config: &Config) -> anyhow::Result<SocketAddr> {
    let addr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;
    Ok(addr)
}
