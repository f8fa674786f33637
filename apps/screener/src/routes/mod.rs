pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::evaluation::handlers;
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Evaluation API
        .route("/api/v1/evaluations", post(handlers::handle_evaluate))
        .route("/api/v1/usage", get(handlers::handle_usage))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
