//! Query log collector
//!
//! Reads query logs from CSV files or JSON records into [`LogRecord`]s.
//! The legacy `exec_time_ms` column is renamed to `execution_time` here,
//! once, so nothing downstream ever sees the alias.

use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use super::models::{AnalyzerError, AnalyzerResult, LogRecord};

pub const LEGACY_EXECUTION_TIME: &str = "exec_time_ms";

const QUERY_ID: &str = "query_id";
const QUERY: &str = "query";
const TIMESTAMP: &str = "timestamp";
const EXECUTION_TIME: &str = "execution_time";
const ROWS_EXAMINED: &str = "rows_examined";

// ============================================================================
// CSV
// ============================================================================

/// Column positions resolved from the CSV header
struct ColumnMap {
    query_id: Option<usize>,
    query: usize,
    timestamp: usize,
    execution_time: usize,
    rows_examined: usize,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> AnalyzerResult<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let required = |name: &'static str, found: Option<usize>| {
            found.ok_or_else(|| AnalyzerError::validation(name, format!("missing required column `{name}`")))
        };

        let execution_time = position(EXECUTION_TIME).or_else(|| position(LEGACY_EXECUTION_TIME));

        Ok(Self {
            query_id: position(QUERY_ID),
            query: required(QUERY, position(QUERY))?,
            timestamp: required(TIMESTAMP, position(TIMESTAMP))?,
            execution_time: required(EXECUTION_TIME, execution_time)?,
            rows_examined: required(ROWS_EXAMINED, position(ROWS_EXAMINED))?,
        })
    }
}

/// Read a CSV query log from disk
pub fn collect_from_csv(path: impl AsRef<Path>) -> AnalyzerResult<Vec<LogRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let records = collect_from_reader(file)?;
    tracing::info!("Collected {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read a CSV query log from any reader; the first line must be a header
pub fn collect_from_reader<R: Read>(reader: R) -> AnalyzerResult<Vec<LogRecord>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);

    let columns = ColumnMap::resolve(reader.headers()?)?;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let cell = |pos: usize| row.get(pos).unwrap_or("");

        let query_id = columns
            .query_id
            .map(cell)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| generated_id(index));

        records.push(LogRecord {
            query_id,
            query: cell(columns.query).to_string(),
            timestamp: cell(columns.timestamp).to_string(),
            execution_time: parse_f64(cell(columns.execution_time), EXECUTION_TIME, index)?,
            rows_examined: parse_u64(cell(columns.rows_examined), ROWS_EXAMINED, index)?,
        });
    }

    Ok(records)
}

// ============================================================================
// JSON
// ============================================================================

/// Convert JSON objects into log records, applying the same rules as CSV
pub fn records_from_json(values: Vec<Value>) -> AnalyzerResult<Vec<LogRecord>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(mut object) => {
                rename_legacy_alias(&mut object);
                record_from_object(&object, index)
            },
            other => Err(AnalyzerError::validation(
                "records",
                format!("record {index} is not an object: {other}"),
            )),
        })
        .collect()
}

fn rename_legacy_alias(object: &mut Map<String, Value>) {
    if !object.contains_key(EXECUTION_TIME) {
        if let Some(value) = object.remove(LEGACY_EXECUTION_TIME) {
            object.insert(EXECUTION_TIME.to_string(), value);
        }
    }
}

fn record_from_object(object: &Map<String, Value>, index: usize) -> AnalyzerResult<LogRecord> {
    let field = |name: &'static str| {
        object
            .get(name)
            .ok_or_else(|| AnalyzerError::validation(name, format!("record {index} is missing `{name}`")))
    };

    let query_id = match object.get(QUERY_ID) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => generated_id(index),
    };

    Ok(LogRecord {
        query_id,
        query: text_value(field(QUERY)?, QUERY, index)?,
        timestamp: text_value(field(TIMESTAMP)?, TIMESTAMP, index)?,
        execution_time: number_value(field(EXECUTION_TIME)?, EXECUTION_TIME, index)?,
        rows_examined: count_value(field(ROWS_EXAMINED)?, ROWS_EXAMINED, index)?,
    })
}

fn text_value(value: &Value, name: &'static str, index: usize) -> AnalyzerResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(AnalyzerError::validation(
            name,
            format!("record {index}: expected a string, got {other}"),
        )),
    }
}

fn number_value(value: &Value, name: &'static str, index: usize) -> AnalyzerResult<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid_number(name, index, &n.to_string())),
        Value::String(s) => parse_f64(s, name, index),
        other => Err(invalid_number(name, index, &other.to_string())),
    }
}

fn count_value(value: &Value, name: &'static str, index: usize) -> AnalyzerResult<u64> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => match n.as_u64() {
            Some(v) => Ok(v),
            None => parse_u64(&n.to_string(), name, index),
        },
        Value::String(s) => parse_u64(s, name, index),
        other => Err(invalid_number(name, index, &other.to_string())),
    }
}

// ============================================================================
// Cell Parsing
// ============================================================================

fn generated_id(index: usize) -> String {
    format!("Q{index}")
}

/// Blank cells count as zero
fn parse_f64(raw: &str, name: &'static str, index: usize) -> AnalyzerResult<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse::<f64>().map_err(|_| invalid_number(name, index, raw))
}

/// Blank cells count as zero; integral floats such as `1200.0` are accepted
/// when they fit in a `u64`
fn parse_u64(raw: &str, name: &'static str, index: usize) -> AnalyzerResult<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        // `u64::MAX as f64` rounds up to 2^64, which is itself out of range
        Ok(v) if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 && v.fract() == 0.0 => Ok(v as u64),
        _ => Err(invalid_number(name, index, raw)),
    }
}

fn invalid_number(name: &'static str, index: usize, raw: &str) -> AnalyzerError {
    AnalyzerError::validation(name, format!("record {index}: '{raw}' is not a valid number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_of(err: AnalyzerError) -> String {
        match err {
            AnalyzerError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_csv_with_legacy_alias() {
        let csv = "query_id,query,timestamp,exec_time_ms,rows_examined\n\
                   Q1,SELECT * FROM users WHERE id = 5,2024-01-01T10:00:00,12.5,40\n\
                   Q2,SELECT 1,2024-01-01T11:00:00,3,1\n";
        let records = collect_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query_id, "Q1");
        assert_eq!(records[0].execution_time, 12.5);
        assert_eq!(records[0].rows_examined, 40);
        assert_eq!(records[1].execution_time, 3.0);
    }

    #[test]
    fn test_csv_canonical_column_wins_over_alias() {
        let csv = "query,timestamp,exec_time_ms,execution_time,rows_examined\n\
                   SELECT 1,2024-01-01T10:00:00,999,7,1\n";
        let records = collect_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(records[0].execution_time, 7.0);
    }

    #[test]
    fn test_csv_quoted_query_with_commas() {
        let csv = "query_id,query,timestamp,execution_time,rows_examined\n\
                   Q1,\"SELECT a, b FROM t WHERE c = 'x'\",2024-01-01T10:00:00,1,1\n";
        let records = collect_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(records[0].query, "SELECT a, b FROM t WHERE c = 'x'");
    }

    #[test]
    fn test_csv_missing_columns_named() {
        let no_exec = "query,timestamp,rows_examined\nSELECT 1,2024-01-01T10:00:00,1\n";
        assert_eq!(field_of(collect_from_reader(no_exec.as_bytes()).unwrap_err()), "execution_time");

        let no_rows = "query,timestamp,execution_time\nSELECT 1,2024-01-01T10:00:00,1\n";
        assert_eq!(field_of(collect_from_reader(no_rows.as_bytes()).unwrap_err()), "rows_examined");

        let no_query = "timestamp,execution_time,rows_examined\n2024-01-01T10:00:00,1,1\n";
        assert_eq!(field_of(collect_from_reader(no_query.as_bytes()).unwrap_err()), "query");
    }

    #[test]
    fn test_csv_generated_ids_and_blank_cells() {
        let csv = "query,timestamp,execution_time,rows_examined\n\
                   SELECT 1,2024-01-01T10:00:00,,\n\
                   SELECT 2,2024-01-01T10:00:00,4,1200.0\n";
        let records = collect_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(records[0].query_id, "Q0");
        assert_eq!(records[0].execution_time, 0.0);
        assert_eq!(records[0].rows_examined, 0);
        assert_eq!(records[1].query_id, "Q1");
        assert_eq!(records[1].rows_examined, 1200);
    }

    #[test]
    fn test_csv_unparsable_cell() {
        let csv = "query,timestamp,execution_time,rows_examined\nSELECT 1,2024-01-01T10:00:00,fast,1\n";
        match collect_from_reader(csv.as_bytes()).unwrap_err() {
            AnalyzerError::Validation { field, detail } => {
                assert_eq!(field, "execution_time");
                assert!(detail.contains("record 0"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rows_examined_out_of_range_rejected() {
        let csv = "query,timestamp,execution_time,rows_examined\nSELECT 1,2024-01-01T10:00:00,1,1e30\n";
        assert_eq!(field_of(collect_from_reader(csv.as_bytes()).unwrap_err()), "rows_examined");

        let err = records_from_json(vec![json!({"query": "SELECT 1", "timestamp": "t",
                                                 "execution_time": 1, "rows_examined": 1e30})])
            .unwrap_err();
        assert_eq!(field_of(err), "rows_examined");

        assert_eq!(parse_u64("18446744073709551616", ROWS_EXAMINED, 0).map_err(field_of), Err("rows_examined".to_string()));
        assert_eq!(parse_u64("1e15", ROWS_EXAMINED, 0).unwrap(), 1_000_000_000_000_000);
    }

    #[test]
    fn test_csv_missing_file() {
        let err = collect_from_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, AnalyzerError::Io(_)));
    }

    #[test]
    fn test_json_records() {
        let records = records_from_json(vec![
            json!({"query_id": "A", "query": "SELECT 1", "timestamp": "2024-01-01T10:00:00Z",
                   "exec_time_ms": 9.5, "rows_examined": 3}),
            json!({"query": "SELECT 2", "timestamp": "2024-01-01T10:00:00Z",
                   "execution_time": null, "rows_examined": "12"}),
        ])
        .unwrap();
        assert_eq!(records[0].query_id, "A");
        assert_eq!(records[0].execution_time, 9.5);
        assert_eq!(records[1].query_id, "Q1");
        assert_eq!(records[1].execution_time, 0.0);
        assert_eq!(records[1].rows_examined, 12);
    }

    #[test]
    fn test_json_missing_field_named() {
        let err = records_from_json(vec![json!({"query": "SELECT 1", "timestamp": "t", "execution_time": 1})])
            .unwrap_err();
        assert_eq!(field_of(err), "rows_examined");
    }

    #[test]
    fn test_json_non_object() {
        let err = records_from_json(vec![json!([1, 2, 3])]).unwrap_err();
        assert_eq!(field_of(err), "records");
    }
}
