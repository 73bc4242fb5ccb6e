use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Reports service version and whether evaluations can run.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-evaluator",
        "evaluationConfigured": state.config.llm.api_key.is_some(),
        "model": state.config.llm.model
    }))
}
