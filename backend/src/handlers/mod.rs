pub mod analyze;
pub mod llm;
pub mod simulate;

use axum::{Json, extract::State};
use std::sync::Arc;

use crate::AppState;
use crate::models::HealthResponse;

/// Health check
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        llm_available: state.text_generator.is_available(),
    })
}
