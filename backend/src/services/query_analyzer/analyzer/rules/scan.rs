//! Scan diagnostic rules (R001)

use super::*;

pub const FULL_SCAN_MESSAGE: &str =
    "large rows examined + high exec time: possible missing index or full scan";

/// R001: Possible full table scan
/// Condition: rows_examined > 100000 AND execution_time > 200ms
pub struct R001FullScan;

impl QueryRule for R001FullScan {
    fn id(&self) -> &str {
        "R001"
    }

    fn name(&self) -> &str {
        "Possible full scan"
    }

    fn evaluate(&self, context: &RuleContext) -> Option<RuleFinding> {
        let t = context.thresholds;
        (context.rows_examined() > t.full_scan_rows
            && context.execution_time_ms() > t.full_scan_exec_ms)
            .then(|| self.finding(FULL_SCAN_MESSAGE))
    }
}

pub fn get_rules() -> Vec<Box<dyn QueryRule>> {
    vec![Box::new(R001FullScan)]
}
