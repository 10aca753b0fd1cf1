//! What-if index simulation handler

use axum::{Json, extract::State};
use std::sync::Arc;

use crate::AppState;
use crate::models::SimulateRequest;
use crate::services::plan_simulator::{SimulationOutcome, simulate_or_fallback};
use crate::utils::error::ApiResult;

/// Compare EXPLAIN plans before and after a temporary index
#[utoipa::path(
    post,
    path = "/api/simulate-index",
    request_body = SimulateRequest,
    responses(
        (status = 200, description = "Plans before/after, or ok=false with a message", body = SimulationOutcome)
    ),
    tag = "Simulation"
)]
pub async fn simulate_index(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SimulateRequest>,
) -> ApiResult<Json<SimulationOutcome>> {
    let outcome =
        simulate_or_fallback(state.plan_simulator.as_ref(), &request.table, &request.column, &request.sql)
            .await;
    Ok(Json(outcome))
}
