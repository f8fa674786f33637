mod config;
mod errors;
mod evaluation;
mod extract;
mod llm_client;
mod routes;
mod state;
mod usage_log;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::evaluation::batch::Pipeline;
use crate::extract::DocumentExtractor;
use crate::llm_client::{ClientSettings, GeminiClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::usage_log::CsvUsageLog;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Gemini client
    let client = GeminiClient::new(ClientSettings {
        api_url: config.gemini_api_url.clone(),
        api_key: config.gemini_api_key.clone(),
        timeout: config.request_timeout,
        max_retries: config.max_retries,
    })?;
    info!(
        "Gemini client initialized (endpoint: {}, timeout: {}s, retries: {})",
        client.api_url(),
        config.request_timeout.as_secs(),
        config.max_retries
    );

    // Initialize usage log
    let usage_log = Arc::new(CsvUsageLog::new(config.usage_log_path.clone()));
    info!("Usage log at {}", usage_log.path().display());

    let pipeline = Pipeline {
        extractor: Arc::new(DocumentExtractor),
        client: Arc::new(client),
        usage_log: usage_log.clone(),
        max_concurrency: config.max_concurrency,
    };

    // Build app state
    let state = AppState {
        config: config.clone(),
        pipeline,
        usage_log,
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
