//! Per-fingerprint aggregation
//!
//! Groups scored rows by template so repeated shapes (N+1 patterns) and
//! heavy templates stand out even when no single execution is an outlier.

use std::collections::HashMap;

use crate::services::query_analyzer::models::{FingerprintSummary, ScoredRow};

/// Templates seen at least this many times are marked `repeated`
pub const DEFAULT_REPEAT_THRESHOLD: usize = 5;

#[derive(Default)]
struct Accumulator {
    normalized: String,
    count: usize,
    total_execution_time: f64,
    max_execution_time: f64,
    total_rows_examined: u64,
    anomaly_count: usize,
}

/// Aggregate rows by fingerprint, heaviest total execution time first
pub fn summarize(rows: &[ScoredRow], repeat_threshold: usize) -> Vec<FingerprintSummary> {
    let mut groups: HashMap<&str, Accumulator> = HashMap::new();

    for row in rows {
        let acc = groups.entry(row.features.fingerprint.as_str()).or_default();
        if acc.count == 0 {
            acc.normalized = row.features.normalized.clone();
        }
        let exec = row.features.feature_vector()[0];
        acc.count += 1;
        acc.total_execution_time += exec;
        acc.max_execution_time = acc.max_execution_time.max(exec);
        acc.total_rows_examined = acc.total_rows_examined.saturating_add(row.features.record.rows_examined);
        if row.anomaly {
            acc.anomaly_count += 1;
        }
    }

    let mut summaries: Vec<(f64, FingerprintSummary)> = groups
        .into_iter()
        .map(|(fingerprint, acc)| {
            let summary = FingerprintSummary {
                fingerprint: fingerprint.to_string(),
                normalized: acc.normalized,
                count: acc.count,
                avg_execution_time: acc.total_execution_time / acc.count as f64,
                max_execution_time: acc.max_execution_time,
                total_rows_examined: acc.total_rows_examined,
                anomaly_count: acc.anomaly_count,
                repeated: acc.count >= repeat_threshold.max(1),
            };
            (acc.total_execution_time, summary)
        })
        .collect();

    summaries.sort_by(|(a_total, a), (b_total, b)| {
        b_total.total_cmp(a_total).then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });

    summaries.into_iter().map(|(_, s)| s).collect()
}
