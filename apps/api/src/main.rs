mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod screening;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::extraction::FileTextExtractor;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::screening::ingest::DocumentIngestor;
use crate::screening::orchestrator::ScreeningOrchestrator;
use crate::screening::scorer::LlmScorer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client and the scorer built on it
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let scorer = Arc::new(LlmScorer(llm));

    // Document registry with the file-format extractor
    let ingestor = Arc::new(DocumentIngestor::new(Arc::new(FileTextExtractor)));

    let settings = config.screening_settings();
    info!(
        "Screening: up to {} concurrent evaluations, {:?} scorer timeout",
        settings.max_concurrent_evaluations, settings.scorer_timeout
    );
    let orchestrator = Arc::new(ScreeningOrchestrator::new(ingestor, scorer, settings));

    // Build app state
    let state = AppState {
        config: config.clone(),
        orchestrator,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
