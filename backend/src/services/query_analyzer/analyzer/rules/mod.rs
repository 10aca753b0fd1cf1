//! Diagnostic rules module
//!
//! Explainable threshold rules evaluated against a single feature row.
//! Rules are independent predicates; adding one means adding a struct and
//! registering it, never touching the existing ones.

pub mod join;
pub mod scan;

use serde::{Deserialize, Serialize};

use crate::services::query_analyzer::models::FeatureRow;

// ============================================================================
// Rule Trait and Types
// ============================================================================

/// Thresholds shared by the built-in rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// R001: rows examined above which a full scan is suspected
    pub full_scan_rows: u64,
    /// R001: execution time (ms) above which a full scan is suspected
    pub full_scan_exec_ms: f64,
    /// R002: rows examined above which a join is considered expensive
    pub join_rows: u64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self { full_scan_rows: 100_000, full_scan_exec_ms: 200.0, join_rows: 50_000 }
    }
}

/// A triggered rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFinding {
    pub rule_id: String,
    pub rule_name: String,
    pub message: String,
}

/// Context for rule evaluation
pub struct RuleContext<'a> {
    pub row: &'a FeatureRow,
    pub thresholds: &'a RuleThresholds,
}

impl<'a> RuleContext<'a> {
    pub fn rows_examined(&self) -> u64 {
        self.row.record.rows_examined
    }

    pub fn execution_time_ms(&self) -> f64 {
        self.row.record.execution_time
    }
}

/// Trait for row-level diagnostic rules
pub trait QueryRule: Send + Sync {
    /// Rule ID (e.g., "R001")
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Evaluate the rule and return a finding if triggered
    fn evaluate(&self, context: &RuleContext) -> Option<RuleFinding>;

    fn finding(&self, message: &str) -> RuleFinding {
        RuleFinding {
            rule_id: self.id().to_string(),
            rule_name: self.name().to_string(),
            message: message.to_string(),
        }
    }
}

// ============================================================================
// Rule Registry
// ============================================================================

/// All built-in rules, in evaluation order
pub fn get_all_rules() -> Vec<Box<dyn QueryRule>> {
    let mut rules: Vec<Box<dyn QueryRule>> = Vec::new();

    // Scan rules (R001)
    rules.extend(scan::get_rules());

    // Join rules (R002)
    rules.extend(join::get_rules());

    rules
}
