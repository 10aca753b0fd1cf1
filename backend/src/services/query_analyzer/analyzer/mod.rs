//! Query log analyzer module
//!
//! Statistical outlier detection, explainable rules, per-template
//! aggregation and index/rewrite suggestions.

pub mod anomaly;
pub mod rule_engine;
pub mod rules;
pub mod suggestion_engine;
pub mod summary;

pub use anomaly::{IsolationForest, IsolationForestConfig, IsolationForestModel, OutlierDetector};
pub use rule_engine::RuleEngine;
pub use rules::{QueryRule, RuleContext, RuleFinding, RuleThresholds};
pub use suggestion_engine::SuggestionEngine;
pub use summary::{DEFAULT_REPEAT_THRESHOLD, summarize};
