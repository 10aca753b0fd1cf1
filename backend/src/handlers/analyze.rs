//! Query log analysis handlers

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::AppState;
use crate::models::{AnalyzeRequest, WhyResponse};
use crate::services::llm::{QueryContext, explain_query};
use crate::services::query_analyzer::{
    AnalysisReport, LogRecord, Recommendation, collector, recommend, recommend_for,
};
use crate::utils::error::{ApiError, ApiErrorResponse, ApiResult};

/// Resolve the request body into log records
fn load_records(request: &AnalyzeRequest) -> ApiResult<Vec<LogRecord>> {
    match (&request.records, &request.csv_path) {
        (Some(records), None) => Ok(collector::records_from_json(records.clone())?),
        (None, Some(path)) => Ok(collector::collect_from_csv(path)?),
        (Some(_), Some(_)) => Err(ApiError::invalid_input("provide either `records` or `csv_path`, not both")),
        (None, None) => Err(ApiError::invalid_input("request must contain `records` or `csv_path`")),
    }
}

/// Load and analyze the batch described by the request
pub(crate) fn run_analysis(state: &AppState, request: &AnalyzeRequest) -> ApiResult<AnalysisReport> {
    let records = load_records(request)?;
    tracing::debug!("Analyzing batch of {} records", records.len());
    Ok(state.analyzer().analyze(&records)?)
}

/// Analyze a batch of query log records
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Scored rows and per-template summaries", body = AnalysisReport),
        (status = 400, description = "Validation error", body = ApiErrorResponse),
        (status = 404, description = "CSV file not found", body = ApiErrorResponse)
    ),
    tag = "Analysis"
)]
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisReport>> {
    let report = run_analysis(&state, &request)?;
    Ok(Json(report))
}

/// Index and rewrite recommendations for one query of the batch
#[utoipa::path(
    post,
    path = "/api/recommendations/{query_id}",
    params(
        ("query_id" = String, Path, description = "Query ID")
    ),
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Recommendation", body = Recommendation),
        (status = 400, description = "Validation error", body = ApiErrorResponse),
        (status = 404, description = "Query not found in batch", body = ApiErrorResponse)
    ),
    tag = "Analysis"
)]
pub async fn recommendation(
    State(state): State<Arc<AppState>>,
    Path(query_id): Path<String>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<Recommendation>> {
    let report = run_analysis(&state, &request)?;
    let rec = recommend_for(&report, &query_id).ok_or_else(|| ApiError::query_not_found(&query_id))?;
    Ok(Json(rec))
}

/// Explain why a query is slow: rule findings, recommendations and LLM prose
#[utoipa::path(
    post,
    path = "/api/why/{query_id}",
    params(
        ("query_id" = String, Path, description = "Query ID")
    ),
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Scored row, recommendation and explanation", body = WhyResponse),
        (status = 400, description = "Validation error", body = ApiErrorResponse),
        (status = 404, description = "Query not found in batch", body = ApiErrorResponse)
    ),
    tag = "Analysis"
)]
pub async fn why(
    State(state): State<Arc<AppState>>,
    Path(query_id): Path<String>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<WhyResponse>> {
    let report = run_analysis(&state, &request)?;
    let row = report.find(&query_id).ok_or_else(|| ApiError::query_not_found(&query_id))?;

    let recommendation = recommend(row);
    let explanation = explain_query(state.text_generator.as_ref(), &QueryContext::from(row)).await;

    Ok(Json(WhyResponse { row: row.clone(), recommendation, explanation }))
}
