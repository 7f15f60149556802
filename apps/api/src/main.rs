mod classify;
mod config;
mod dedupe;
mod dispatch;
mod errors;
mod llm_client;
mod mail;
mod pipeline;
mod routes;
mod scheduler;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::dedupe::RedisStore;
use crate::llm_client::LlmClient;
use crate::mail::GmailClient;
use crate::pipeline::{Pipeline, PipelineSettings};
use crate::routes::build_router;
use crate::scheduler::{run_scheduler, validate_cron_expression};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mailroom v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Redis (dedupe cache)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let cache = Arc::new(RedisStore::new(redis));
    info!("Redis client initialized");

    // Initialize mail provider
    let gmail = Arc::new(GmailClient::new(
        config.gmail_api_base.clone(),
        config.gmail_access_token.clone(),
        config.recruitment_mail.clone(),
    ));
    info!("Gmail client initialized (mailbox: {})", config.recruitment_mail);

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build the triage pipeline
    let pipeline = Arc::new(Pipeline::new(
        gmail,
        llm,
        cache,
        PipelineSettings::from_config(&config),
    ));

    // Spawn the cron trigger, if scheduled runs are configured
    if let Some(expression) = config.cron_schedule.clone() {
        validate_cron_expression(&expression)?;
        info!("scheduling pipeline runs: {expression}");
        tokio::spawn(run_scheduler(pipeline.clone(), expression));
    } else {
        info!("no CRON_SCHEDULE set, manual trigger only");
    }

    // Build app state + router
    let state = AppState { pipeline };
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
