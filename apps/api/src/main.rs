mod api;
mod config;
mod db;
mod email;
mod errors;
mod llm_client;
mod middleware;
mod models;
mod rejections;
mod resumes;
mod routes;
mod scoring;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::email::resend::ResendClient;
use crate::llm_client::LlmClient;
use crate::rejections::dispatcher::RejectionDispatcher;
use crate::rejections::postgres::PgRejectionRepository;
use crate::routes::build_router;
use crate::scoring::postgres::PgScoreRepository;
use crate::scoring::SkillMatchScorer;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Seeds API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let rejections = Arc::new(PgRejectionRepository::new(db.clone()));
    let scores = Arc::new(PgScoreRepository::new(db));

    // Initialize email provider
    let mailer = Arc::new(ResendClient::new(
        config.resend_api_key.clone(),
        &config.resend_api_url,
        config.default_from_email.clone(),
    )?);
    info!(from = %config.default_from_email, "Email client initialized");

    // Rejection dispatcher shares the repository with the scheduling endpoints
    let dispatch_settings = config.dispatch_settings();
    let dispatcher = Arc::new(RejectionDispatcher::new(
        rejections.clone(),
        mailer,
        dispatch_settings,
    ));
    info!(
        batch_size = dispatch_settings.batch_size,
        batch_delay_ms = dispatch_settings.batch_delay.as_millis() as u64,
        "Rejection dispatcher initialized"
    );

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    if config.internal_api_secret.is_none() {
        tracing::warn!("INTERNAL_API_SECRET is not set; internal routes will refuse every call");
    }

    // Build app state
    let state = AppState {
        config: config.clone(),
        llm,
        rejections,
        dispatcher,
        scorer: Arc::new(SkillMatchScorer),
        scores,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
