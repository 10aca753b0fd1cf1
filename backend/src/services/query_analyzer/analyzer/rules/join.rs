//! Join diagnostic rules (R002)

use super::*;

pub const EXPENSIVE_JOIN_MESSAGE: &str = "expensive join detected: check join keys and indexes";

/// R002: Expensive join
/// Condition: query joins AND rows_examined > 50000
pub struct R002ExpensiveJoin;

impl QueryRule for R002ExpensiveJoin {
    fn id(&self) -> &str {
        "R002"
    }

    fn name(&self) -> &str {
        "Expensive join"
    }

    fn evaluate(&self, context: &RuleContext) -> Option<RuleFinding> {
        (context.row.is_join && context.rows_examined() > context.thresholds.join_rows)
            .then(|| self.finding(EXPENSIVE_JOIN_MESSAGE))
    }
}

pub fn get_rules() -> Vec<Box<dyn QueryRule>> {
    vec![Box::new(R002ExpensiveJoin)]
}
