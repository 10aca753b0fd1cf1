//! Query log data models
//!
//! Types flowing through the analysis pipeline, from the raw log row to the
//! scored row and its recommendation. Nothing here outlives a single batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the analysis core.
///
/// Malformed SQL text never produces an error: normalization and suggestion
/// degrade to best-effort output instead.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Validation error on `{field}`: {detail}")]
    Validation { field: String, detail: String },

    #[error("Failed to read query log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
}

impl AnalyzerError {
    pub fn validation(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), detail: detail.into() }
    }
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

// ============================================================================
// Pipeline Rows
// ============================================================================

/// One executed query as read from the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LogRecord {
    pub query_id: String,
    pub query: String,
    /// Raw timestamp text; parsed during feature extraction
    pub timestamp: String,
    /// Execution time in milliseconds
    pub execution_time: f64,
    pub rows_examined: u64,
}

/// Log record augmented with normalized text and shape flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeatureRow {
    #[serde(flatten)]
    pub record: LogRecord,
    pub normalized: String,
    pub fingerprint: String,
    pub hour_of_day: u32,
    pub is_select: bool,
    pub is_join: bool,
}

impl FeatureRow {
    /// The 2-dimensional point the outlier model is trained on
    pub fn feature_vector(&self) -> [f64; 2] {
        let exec = if self.record.execution_time.is_finite() {
            self.record.execution_time
        } else {
            0.0
        };
        [exec, self.record.rows_examined as f64]
    }
}

/// Feature row with the statistical flag and rule explanations attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoredRow {
    #[serde(flatten)]
    pub features: FeatureRow,
    pub anomaly: bool,
    pub reasons: Vec<String>,
}

impl ScoredRow {
    pub fn query_id(&self) -> &str {
        &self.features.record.query_id
    }

    /// True when either the model or a rule flagged the row
    pub fn is_flagged(&self) -> bool {
        self.anomaly || !self.reasons.is_empty()
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// Why a column was proposed for indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IndexReason {
    WhereFilter,
    JoinKey,
}

/// A single recommendation item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecItem {
    CreateIndex { column: String, reason: IndexReason },
    RewriteQuery { suggestion: String },
}

impl RecItem {
    pub fn create_index(column: impl Into<String>, reason: IndexReason) -> Self {
        Self::CreateIndex { column: column.into(), reason }
    }

    pub fn rewrite(suggestion: impl Into<String>) -> Self {
        Self::RewriteQuery { suggestion: suggestion.into() }
    }

    /// Deduplication key: (type, column-or-suggestion)
    pub fn dedup_key(&self) -> (&'static str, &str) {
        match self {
            Self::CreateIndex { column, .. } => ("create_index", column.as_str()),
            Self::RewriteQuery { suggestion } => ("rewrite_query", suggestion.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    pub query_id: String,
    pub recs: Vec<RecItem>,
    /// Rule-engine reasons, verbatim
    pub explain: Vec<String>,
}

// ============================================================================
// Batch Report
// ============================================================================

/// Aggregated statistics for one query template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FingerprintSummary {
    pub fingerprint: String,
    pub normalized: String,
    pub count: usize,
    pub avg_execution_time: f64,
    pub max_execution_time: f64,
    pub total_rows_examined: u64,
    pub anomaly_count: usize,
    /// Template repeated often enough to look like an N+1 pattern
    pub repeated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisReport {
    pub total: usize,
    pub anomaly_count: usize,
    pub flagged_count: usize,
    pub rows: Vec<ScoredRow>,
    pub summaries: Vec<FingerprintSummary>,
}

impl AnalysisReport {
    pub fn find(&self, query_id: &str) -> Option<&ScoredRow> {
        self.rows.iter().find(|r| r.query_id() == query_id)
    }
}
