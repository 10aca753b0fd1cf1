//! Query Log Analyzer
//!
//! Turns a batch of executed-query log records into scored rows, per-template
//! summaries and index/rewrite recommendations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          QueryAnalyzer                           │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                         analyze()                          │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! │                               │                                  │
//! │     ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐   │
//! │     │  Collector  │ ─▶ │  Features   │ ─▶ │     Analyzer     │   │
//! │     │  CSV / JSON │    │ ┌─────────┐ │    │ ┌──────────────┐ │   │
//! │     └─────────────┘    │ │Normalize│ │    │ │  IsoForest   │ │   │
//! │                        │ └─────────┘ │    │ └──────────────┘ │   │
//! │                        │ ┌─────────┐ │    │ ┌──────────────┐ │   │
//! │                        │ │Fingerprt│ │    │ │  RuleEngine  │ │   │
//! │                        │ └─────────┘ │    │ └──────────────┘ │   │
//! │                        └─────────────┘    │ ┌──────────────┐ │   │
//! │                                           │ │  Suggestion  │ │   │
//! │                                           │ │    Engine    │ │   │
//! │                                           │ └──────────────┘ │   │
//! │                                           └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use query_profiler::services::query_analyzer::{AnalyzerConfig, QueryAnalyzer, collector, recommend};
//!
//! let records = collector::collect_from_csv("logs/queries.csv")?;
//! let report = QueryAnalyzer::new(&AnalyzerConfig::default()).analyze(&records)?;
//!
//! for row in report.rows.iter().filter(|r| r.is_flagged()) {
//!     let rec = recommend(row);
//!     println!("{}: {:?}", rec.query_id, rec.recs);
//! }
//! ```

pub mod analyzer;
pub mod collector;
pub mod features;
pub mod models;
pub mod parser;

#[cfg(test)]
mod tests;

pub use analyzer::{
    DEFAULT_REPEAT_THRESHOLD, IsolationForest, IsolationForestConfig, OutlierDetector, RuleEngine,
    RuleThresholds, SuggestionEngine,
};
pub use models::*;
pub use parser::{fingerprint, normalize};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Analyzer section of the application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub forest: IsolationForestConfig,
    pub rules: RuleThresholds,
    /// Templates seen at least this often are reported as repeated
    pub repeat_threshold: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            forest: IsolationForestConfig::default(),
            rules: RuleThresholds::default(),
            repeat_threshold: DEFAULT_REPEAT_THRESHOLD,
        }
    }
}

/// Batch pipeline: features, outlier model, rules, summaries
pub struct QueryAnalyzer<D: OutlierDetector = IsolationForest> {
    detector: D,
    rule_engine: RuleEngine,
    repeat_threshold: usize,
}

impl QueryAnalyzer<IsolationForest> {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::with_detector(
            IsolationForest::new(config.forest.clone()),
            RuleEngine::with_thresholds(config.rules.clone()),
            config.repeat_threshold,
        )
    }
}

impl<D: OutlierDetector> QueryAnalyzer<D> {
    /// Build a pipeline around an alternative outlier strategy
    pub fn with_detector(detector: D, rule_engine: RuleEngine, repeat_threshold: usize) -> Self {
        Self { detector, rule_engine, repeat_threshold }
    }

    /// Score every record in the batch.
    ///
    /// Validation failures abort the whole batch. No row is flagged before the
    /// model has been fit over all of them.
    pub fn score(&self, records: &[LogRecord]) -> AnalyzerResult<Vec<ScoredRow>> {
        ensure_unique_ids(records)?;

        let rows = features::extract_batch(records)?;
        let model = self.detector.fit(&rows)?;
        let flags = self.detector.score(&rows, &model);

        Ok(rows
            .into_iter()
            .zip(flags)
            .map(|(features, anomaly)| {
                let reasons = self.rule_engine.evaluate(&features);
                ScoredRow { features, anomaly, reasons }
            })
            .collect())
    }

    /// Score the batch and aggregate it into a report
    pub fn analyze(&self, records: &[LogRecord]) -> AnalyzerResult<AnalysisReport> {
        let rows = self.score(records)?;
        let summaries = analyzer::summarize(&rows, self.repeat_threshold);

        let anomaly_count = rows.iter().filter(|r| r.anomaly).count();
        let flagged_count = rows.iter().filter(|r| !r.reasons.is_empty()).count();

        tracing::info!(
            "Analyzed {} queries: {} anomalies, {} rule hits, {} templates",
            rows.len(),
            anomaly_count,
            flagged_count,
            summaries.len()
        );

        Ok(AnalysisReport { total: rows.len(), anomaly_count, flagged_count, rows, summaries })
    }
}

/// Analyze a batch with the default configuration
pub fn analyze_batch(records: &[LogRecord]) -> AnalyzerResult<AnalysisReport> {
    QueryAnalyzer::new(&AnalyzerConfig::default()).analyze(records)
}

pub fn recommend(row: &ScoredRow) -> Recommendation {
    SuggestionEngine::recommend(row)
}

/// Recommendation for one query id of an analyzed batch
pub fn recommend_for(report: &AnalysisReport, query_id: &str) -> Option<Recommendation> {
    report.find(query_id).map(SuggestionEngine::recommend)
}

fn ensure_unique_ids(records: &[LogRecord]) -> AnalyzerResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.query_id.as_str()) {
            return Err(AnalyzerError::validation(
                "query_id",
                format!("duplicate query_id '{}' in batch", record.query_id),
            ));
        }
    }
    Ok(())
}
