//! Rule Engine for query log diagnostics
//!
//! Evaluates every registered rule against a row, in registration order,
//! and collects the human-readable reasons. Stateless across rows.

use super::rules::{QueryRule, RuleContext, RuleFinding, RuleThresholds, get_all_rules};
use crate::services::query_analyzer::models::FeatureRow;

/// Rule engine for row diagnostics
pub struct RuleEngine {
    thresholds: RuleThresholds,
    rules: Vec<Box<dyn QueryRule>>,
}

impl RuleEngine {
    /// Create a new rule engine with default thresholds
    pub fn new() -> Self {
        Self::with_thresholds(RuleThresholds::default())
    }

    pub fn with_thresholds(thresholds: RuleThresholds) -> Self {
        Self { thresholds, rules: get_all_rules() }
    }

    /// Append a rule after the built-in ones
    pub fn with_rule(mut self, rule: Box<dyn QueryRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// All triggered rules for a row, in rule order
    pub fn findings(&self, row: &FeatureRow) -> Vec<RuleFinding> {
        let context = RuleContext { row, thresholds: &self.thresholds };
        self.rules.iter().filter_map(|rule| rule.evaluate(&context)).collect()
    }

    /// Reason strings for a row (possibly empty)
    pub fn evaluate(&self, row: &FeatureRow) -> Vec<String> {
        self.findings(row).into_iter().map(|f| f.message).collect()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
