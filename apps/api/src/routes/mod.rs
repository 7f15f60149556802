pub mod health;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::pipeline::{RunReport, Trigger};
use crate::state::AppState;

/// Body of the manual trigger call. The cron scaffolding that used to invoke
/// this endpoint posted `{ "inputData": true }`; the field is accepted and
/// ignored so those callers keep working.
#[derive(Debug, Deserialize, Default)]
pub struct RunTriggerRequest {
    #[serde(default, rename = "inputData")]
    #[allow(dead_code)]
    pub input_data: Option<serde_json::Value>,
}

/// POST /api/v1/pipeline/run
pub async fn handle_run_pipeline(
    State(state): State<AppState>,
    body: Option<Json<RunTriggerRequest>>,
) -> Result<Json<RunReport>, AppError> {
    let _ = body; // trigger payload carries no information
    let report = state
        .pipeline
        .run_with_retry(Trigger::Manual)
        .await
        .map_err(|e| AppError::Mail(e.to_string()))?;
    Ok(Json(report))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/pipeline/run", post(handle_run_pipeline))
        .with_state(state)
}
