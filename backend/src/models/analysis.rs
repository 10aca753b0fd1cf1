use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::services::llm::ChatTurn;
use crate::services::query_analyzer::{Recommendation, ScoredRow};

// ============================================================================
// Requests
// ============================================================================

/// Source of the log batch: inline records or a CSV file readable by the server
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Log records as JSON objects (`exec_time_ms` is accepted for `execution_time`)
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub records: Option<Vec<Value>>,
    #[serde(default)]
    pub csv_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub question: String,
    /// Rows to include as context; defaults to the flagged rows
    #[serde(default)]
    pub query_ids: Option<Vec<String>>,
    #[serde(default)]
    pub source: Option<AnalyzeRequest>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SimulateRequest {
    pub table: String,
    pub column: String,
    pub sql: String,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WhyResponse {
    pub row: ScoredRow,
    pub recommendation: Recommendation,
    /// LLM explanation, or a fixed fallback text
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub llm_available: bool,
}
