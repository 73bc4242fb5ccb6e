use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resume_evaluator::config::Config;
use resume_evaluator::llm_client::LlmClient;
use resume_evaluator::routes::build_router;
use resume_evaluator::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume evaluator v{}", env!("CARGO_PKG_VERSION"));

    if config.llm.api_key.is_none() {
        warn!("ABACUSAI_API_KEY is not set; evaluations will fail until it is configured");
    }

    let llm = LlmClient::new(config.llm.api_url.clone())?;
    info!(
        "LLM client initialized (model: {}, endpoint: {})",
        config.llm.model, config.llm.api_url
    );
    match config.stream_idle_timeout {
        Some(limit) => info!("Upstream idle timeout: {limit:?}"),
        None => info!("Upstream idle timeout disabled"),
    }

    let state = AppState::new(config.clone(), Arc::new(llm));

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
