//! Explain Scenario - LLM explanation of a single slow query

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::llm::{TextGenerator, clean_response};
use crate::services::query_analyzer::ScoredRow;

const PROMPT: &str = include_str!("explain_prompt.md");

pub const EXPLAIN_FALLBACK: &str =
    "AI explanation is unavailable. See the heuristic findings and recommendations instead.";

// ============================================================================
// Request
// ============================================================================

/// Snapshot of a scored row handed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueryContext {
    pub query_id: String,
    pub query: String,
    pub normalized: String,
    pub execution_time: f64,
    pub rows_examined: u64,
    pub anomaly: bool,
    pub reasons: Vec<String>,
}

impl From<&ScoredRow> for QueryContext {
    fn from(row: &ScoredRow) -> Self {
        Self {
            query_id: row.query_id().to_string(),
            query: row.features.record.query.clone(),
            normalized: row.features.normalized.clone(),
            execution_time: row.features.record.execution_time,
            rows_examined: row.features.record.rows_examined,
            anomaly: row.anomaly,
            reasons: row.reasons.clone(),
        }
    }
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExplainResp {
    #[serde(default)]
    reason: String,
}

/// Extract the explanation from model output; plain prose is accepted as is
fn parse_explanation(raw: &str) -> Option<String> {
    let cleaned = clean_response(raw);
    let text = match serde_json::from_str::<ExplainResp>(&cleaned) {
        Ok(resp) => resp.reason.trim().to_string(),
        Err(_) => cleaned,
    };
    (!text.is_empty()).then_some(text)
}

/// Explain why a query is slow; never fails
pub async fn explain_query(generator: &dyn TextGenerator, context: &QueryContext) -> String {
    if !generator.is_available() {
        return EXPLAIN_FALLBACK.to_string();
    }

    let payload = match serde_json::to_string_pretty(context) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Failed to build explain payload for {}: {}", context.query_id, e);
            return EXPLAIN_FALLBACK.to_string();
        },
    };

    match generator.generate(PROMPT, &payload).await {
        Ok(raw) => parse_explanation(&raw).unwrap_or_else(|| {
            tracing::warn!("Explanation for {} was empty", context.query_id);
            EXPLAIN_FALLBACK.to_string()
        }),
        Err(e) => {
            tracing::warn!("Explanation for {} failed: {}", context.query_id, e);
            EXPLAIN_FALLBACK.to_string()
        },
    }
}
