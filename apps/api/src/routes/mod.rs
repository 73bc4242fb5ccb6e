pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::export::handlers::handle_export;
use crate::relay::handlers::handle_evaluate;
use crate::state::AppState;
use crate::upload::handlers::handle_upload;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.limits.max_request_body_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/upload", post(handle_upload))
        .route("/api/evaluate", post(handle_evaluate))
        .route("/api/export", post(handle_export))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
