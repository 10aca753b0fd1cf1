//! LLM API Handlers
//!
//! Conversational assistant over an analyzed batch.

use axum::{Json, extract::State};
use std::sync::Arc;

use crate::AppState;
use crate::handlers::analyze::run_analysis;
use crate::models::{ChatRequest, ChatResponse};
use crate::services::llm::{QueryContext, chat_reply};
use crate::services::query_analyzer::AnalysisReport;
use crate::utils::error::{ApiError, ApiErrorResponse, ApiResult};

/// Upper bound on rows sent to the model when no ids are given
const MAX_CONTEXT_ROWS: usize = 20;

fn select_context(report: &AnalysisReport, query_ids: Option<&[String]>) -> Vec<QueryContext> {
    match query_ids {
        Some(ids) => ids.iter().filter_map(|id| report.find(id)).map(QueryContext::from).collect(),
        None => report
            .rows
            .iter()
            .filter(|r| r.is_flagged())
            .take(MAX_CONTEXT_ROWS)
            .map(QueryContext::from)
            .collect(),
    }
}

/// Ask a question about the analyzed query log
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant answer (fallback text when the LLM is unavailable)", body = ChatResponse),
        (status = 400, description = "Validation error", body = ApiErrorResponse)
    ),
    tag = "LLM"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if request.question.trim().is_empty() {
        return Err(ApiError::invalid_input("question cannot be empty"));
    }

    let context = match &request.source {
        Some(source) => {
            let report = run_analysis(&state, source)?;
            select_context(&report, request.query_ids.as_deref())
        },
        None => Vec::new(),
    };

    tracing::debug!("Chat question with {} context rows", context.len());

    let answer =
        chat_reply(state.text_generator.as_ref(), &request.history, &request.question, &context).await;
    Ok(Json(ChatResponse { answer }))
}
