//! Feature extraction
//!
//! Turns a log record into a feature row: normalized text, fingerprint,
//! hour of day and query-shape flags. Pure and per-row.

use chrono::{DateTime, NaiveDateTime, Timelike};

use super::models::{AnalyzerError, AnalyzerResult, FeatureRow, LogRecord};
use super::parser::{fingerprint, normalize};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Extract features from a single record
pub fn extract(record: &LogRecord) -> AnalyzerResult<FeatureRow> {
    if !record.execution_time.is_finite() || record.execution_time < 0.0 {
        return Err(AnalyzerError::validation(
            "execution_time",
            format!(
                "query {} has invalid execution_time {}",
                record.query_id, record.execution_time
            ),
        ));
    }

    let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| {
        AnalyzerError::validation(
            "timestamp",
            format!(
                "query {} has unparseable timestamp '{}'",
                record.query_id, record.timestamp
            ),
        )
    })?;

    let normalized = normalize(&record.query);
    let upper = normalized.to_uppercase();

    Ok(FeatureRow {
        record: record.clone(),
        fingerprint: fingerprint(&normalized),
        hour_of_day: timestamp.hour(),
        is_select: upper.starts_with("SELECT"),
        is_join: upper.contains(" JOIN "),
        normalized,
    })
}

/// Extract features for a whole batch; the first invalid record aborts it
pub fn extract_batch(records: &[LogRecord]) -> AnalyzerResult<Vec<FeatureRow>> {
    records.iter().map(extract).collect()
}

/// Parse RFC 3339 or naive ISO-8601 timestamps into the wall-clock time the
/// query ran; an explicit offset is kept, not converted to UTC
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    NAIVE_FORMATS.iter().find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
