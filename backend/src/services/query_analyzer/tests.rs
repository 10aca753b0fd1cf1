//! End-to-end tests for the query analyzer pipeline

use super::*;
use crate::services::query_analyzer::analyzer::rules::join::EXPENSIVE_JOIN_MESSAGE;
use crate::services::query_analyzer::analyzer::rules::scan::FULL_SCAN_MESSAGE;
use crate::services::query_analyzer::analyzer::suggestion_engine::LEADING_WILDCARD_SUGGESTION;

fn record(id: &str, query: &str, execution_time: f64, rows_examined: u64) -> LogRecord {
    LogRecord {
        query_id: id.to_string(),
        query: query.to_string(),
        timestamp: "2024-05-02T13:45:00".to_string(),
        execution_time,
        rows_examined,
    }
}

/// Quiet background traffic the scenario rows are mixed into
fn background(n: usize) -> Vec<LogRecord> {
    (0..n)
        .map(|i| {
            record(
                &format!("BG{i}"),
                &format!("SELECT name FROM users WHERE email = 'user{i}@example.com'"),
                20.0 + (i % 7) as f64,
                100 + (i % 13) as u64,
            )
        })
        .collect()
}

fn analyzer() -> QueryAnalyzer {
    QueryAnalyzer::new(&AnalyzerConfig::default())
}

// ========================================================================
// Scenarios
// ========================================================================

#[test]
fn test_full_scan_scenario() {
    let mut records = background(30);
    records.push(record("A", "SELECT * FROM users WHERE id = 123", 250.0, 150_000));

    let report = analyzer().analyze(&records).unwrap();
    let row = report.find("A").unwrap();
    assert_eq!(row.reasons, vec![FULL_SCAN_MESSAGE]);

    let rec = recommend(row);
    assert_eq!(rec.query_id, "A");
    assert_eq!(rec.recs, vec![RecItem::create_index("ID", IndexReason::WhereFilter)]);
    assert_eq!(rec.explain, row.reasons);
}

#[test]
fn test_expensive_join_scenario() {
    let mut records = background(30);
    records.push(record(
        "B",
        "SELECT u.name, o.total FROM users u JOIN orders o ON u.id = o.user_id WHERE o.total > 10",
        10.0,
        60_000,
    ));

    let report = analyzer().analyze(&records).unwrap();
    let row = report.find("B").unwrap();
    assert!(row.features.is_join);
    assert_eq!(row.reasons, vec![EXPENSIVE_JOIN_MESSAGE]);

    let rec = recommend_for(&report, "B").unwrap();
    assert_eq!(
        rec.recs,
        vec![
            RecItem::create_index("U.ID", IndexReason::JoinKey),
            RecItem::create_index("O.USER_ID", IndexReason::JoinKey),
        ]
    );
}

#[test]
fn test_statistical_outliers_scenario() {
    let mut records: Vec<LogRecord> = (0..98)
        .map(|i| {
            record(
                &format!("N{i}"),
                "SELECT * FROM orders WHERE id = 1",
                100.0 + (i % 10) as f64 * 0.5,
                1_000 + (i % 20) as u64,
            )
        })
        .collect();
    records.push(record("OUT1", "SELECT * FROM orders WHERE status = 'x'", 5_000.0, 2_000_000));
    records.push(record("OUT2", "SELECT * FROM orders WHERE status = 'y'", 7_500.0, 3_500_000));

    let report = analyzer().analyze(&records).unwrap();
    assert_eq!(report.total, 100);

    let flagged: Vec<&str> = report.rows.iter().filter(|r| r.anomaly).map(|r| r.query_id()).collect();
    assert_eq!(flagged, vec!["OUT1", "OUT2"]);
    assert_eq!(report.anomaly_count, 2);
}

#[test]
fn test_leading_wildcard_scenario() {
    let mut records = background(10);
    records.push(record("D", "SELECT * FROM t WHERE name LIKE '%abc'", 21.0, 105));

    let report = analyzer().analyze(&records).unwrap();
    let rec = recommend_for(&report, "D").unwrap();
    assert!(rec.recs.contains(&RecItem::rewrite(LEADING_WILDCARD_SUGGESTION)));
}

#[test]
fn test_unflagged_row_gets_no_index_suggestion() {
    let records = background(10);
    let report = analyzer().analyze(&records).unwrap();
    let quiet = report.rows.iter().find(|r| !r.is_flagged()).unwrap();
    assert!(recommend(quiet).recs.is_empty());
}

// ========================================================================
// Batch Validation
// ========================================================================

#[test]
fn test_single_row_batch_rejected() {
    let err = analyzer().analyze(&background(1)).unwrap_err();
    assert!(matches!(err, AnalyzerError::Validation { ref field, .. } if field == "rows"));
}

#[test]
fn test_duplicate_query_id_rejected() {
    let mut records = background(5);
    records.push(record("BG0", "SELECT 1", 1.0, 1));
    let err = analyzer().analyze(&records).unwrap_err();
    assert!(matches!(err, AnalyzerError::Validation { ref field, .. } if field == "query_id"));
}

#[test]
fn test_bad_timestamp_aborts_batch() {
    let mut records = background(5);
    records[3].timestamp = "not a time".to_string();
    let err = analyzer().analyze(&records).unwrap_err();
    assert!(matches!(err, AnalyzerError::Validation { ref field, .. } if field == "timestamp"));
}

// ========================================================================
// Report
// ========================================================================

#[test]
fn test_report_groups_templates() {
    let mut records = background(12);
    records.push(record("X1", "select * from users where id = 7", 30.0, 10));
    records.push(record("X2", "SELECT *   FROM users WHERE id = 9000", 40.0, 10));

    let report = analyzer().analyze(&records).unwrap();
    assert_eq!(report.summaries.len(), 2);

    let background_summary = report.summaries.iter().find(|s| s.count == 12).unwrap();
    assert!(background_summary.repeated);

    let id_summary = report.summaries.iter().find(|s| s.count == 2).unwrap();
    assert_eq!(id_summary.normalized, "SELECT * FROM users WHERE id = ?");
    assert_eq!(id_summary.avg_execution_time, 35.0);
    assert!(!id_summary.repeated);
}

#[test]
fn test_recommend_for_unknown_id() {
    let report = analyzer().analyze(&background(4)).unwrap();
    assert!(recommend_for(&report, "nope").is_none());
}

#[test]
fn test_deterministic_reports() {
    let mut records = background(40);
    records.push(record("HOT", "SELECT * FROM big_table WHERE status = 'x'", 900.0, 400_000));
    let first = analyzer().analyze(&records).unwrap();
    let second = analyze_batch(&records).unwrap();
    assert_eq!(first, second);
}

// ========================================================================
// Pluggable Detector
// ========================================================================

struct NeverAnomalous;

impl OutlierDetector for NeverAnomalous {
    type Model = ();

    fn fit(&self, _rows: &[FeatureRow]) -> AnalyzerResult<()> {
        Ok(())
    }

    fn score(&self, rows: &[FeatureRow], _model: &()) -> Vec<bool> {
        vec![false; rows.len()]
    }
}

#[test]
fn test_custom_detector_keeps_rules() {
    let analyzer = QueryAnalyzer::with_detector(NeverAnomalous, RuleEngine::new(), DEFAULT_REPEAT_THRESHOLD);
    let records = vec![record("A", "SELECT * FROM users WHERE id = 1", 250.0, 150_000)];

    let report = analyzer.analyze(&records).unwrap();
    assert_eq!(report.anomaly_count, 0);
    assert_eq!(report.flagged_count, 1);
    assert_eq!(report.rows[0].reasons, vec![FULL_SCAN_MESSAGE]);
}
