//! What-if index simulation
//!
//! Compares `EXPLAIN FORMAT=JSON` output before and after creating a
//! temporary index on a scratch MySQL database. The temporary index is always
//! dropped, even when the second EXPLAIN fails. Failures never escape
//! [`simulate_or_fallback`]; they become an outcome with `ok = false`.

use async_trait::async_trait;
use mysql_async::Pool;
use mysql_async::prelude::Queryable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::SimulatorConfig;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Plan simulator is not configured")]
    NotConfigured,

    #[error("Invalid {kind} identifier '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Only a single SELECT statement can be simulated")]
    InvalidStatement,

    #[error("Database error: {0}")]
    Database(#[from] mysql_async::Error),

    #[error("EXPLAIN returned no plan")]
    EmptyPlan,

    #[error("EXPLAIN returned malformed JSON: {0}")]
    InvalidPlan(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WhatIfPlan {
    #[schema(value_type = Object)]
    pub plan_before: Value,
    #[schema(value_type = Object)]
    pub plan_after: Value,
}

/// Result of a simulation request, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SimulationOutcome {
    pub ok: bool,
    pub table: String,
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub plan_before: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub plan_after: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Simulator Trait
// ============================================================================

#[async_trait]
pub trait PlanSimulator: Send + Sync {
    async fn simulate(&self, table: &str, column: &str, sql: &str) -> Result<WhatIfPlan, SimulatorError>;
}

pub struct DisabledSimulator;

#[async_trait]
impl PlanSimulator for DisabledSimulator {
    async fn simulate(&self, _table: &str, _column: &str, _sql: &str) -> Result<WhatIfPlan, SimulatorError> {
        Err(SimulatorError::NotConfigured)
    }
}

pub struct MySqlPlanSimulator {
    pool: Pool,
}

impl MySqlPlanSimulator {
    pub fn new(url: &str) -> Result<Self, SimulatorError> {
        let pool = Pool::from_url(url).map_err(mysql_async::Error::from)?;
        Ok(Self { pool })
    }

    async fn explain(conn: &mut mysql_async::Conn, sql: &str) -> Result<Value, SimulatorError> {
        let plan: Option<String> = conn.query_first(format!("EXPLAIN FORMAT=JSON {sql}")).await?;
        let plan = plan.ok_or(SimulatorError::EmptyPlan)?;
        Ok(serde_json::from_str(&plan)?)
    }
}

#[async_trait]
impl PlanSimulator for MySqlPlanSimulator {
    async fn simulate(&self, table: &str, column: &str, sql: &str) -> Result<WhatIfPlan, SimulatorError> {
        validate_identifier("table", table)?;
        let column = bare_column(column);
        validate_identifier("column", column)?;
        let statement = validate_statement(sql)?;
        let index_name = temp_index_name(table, column);

        let mut conn = self.pool.get_conn().await?;
        let plan_before = Self::explain(&mut conn, statement).await?;

        tracing::info!("Creating temporary index {} on {}({})", index_name, table, column);
        conn.query_drop(format!("CREATE INDEX {index_name} ON {table} ({column})")).await?;

        let plan_after: Result<Value, SimulatorError> = async {
            conn.query_drop(format!("ANALYZE TABLE {table}")).await?;
            Self::explain(&mut conn, statement).await
        }
        .await;

        if let Err(e) = conn.query_drop(format!("DROP INDEX {index_name} ON {table}")).await {
            tracing::error!("Failed to drop temporary index {} on {}: {}", index_name, table, e);
        }

        Ok(WhatIfPlan { plan_before, plan_after: plan_after? })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Pick the simulator for the current configuration
pub fn build_simulator(config: &SimulatorConfig) -> Arc<dyn PlanSimulator> {
    match (&config.mysql_url, config.enabled) {
        (Some(url), true) => match MySqlPlanSimulator::new(url) {
            Ok(simulator) => {
                tracing::info!("Plan simulator enabled");
                Arc::new(simulator)
            },
            Err(e) => {
                tracing::warn!("Invalid simulator.mysql_url, simulator disabled: {}", e);
                Arc::new(DisabledSimulator)
            },
        },
        _ => Arc::new(DisabledSimulator),
    }
}

/// Run a simulation, converting any failure into a descriptive outcome
pub async fn simulate_or_fallback(
    simulator: &dyn PlanSimulator,
    table: &str,
    column: &str,
    sql: &str,
) -> SimulationOutcome {
    let (ok, plan_before, plan_after, message) = match simulator.simulate(table, column, sql).await {
        Ok(plan) => (true, Some(plan.plan_before), Some(plan.plan_after), None),
        Err(e) => {
            tracing::warn!("Index simulation on {}({}) failed: {}", table, column, e);
            (false, None, None, Some(format!("Simulation unavailable: {e}")))
        },
    };

    SimulationOutcome {
        ok,
        table: table.to_string(),
        column: column.to_string(),
        plan_before,
        plan_after,
        message,
    }
}

fn validate_identifier(kind: &'static str, value: &str) -> Result<(), SimulatorError> {
    let valid = !value.is_empty()
        && !value.starts_with('.')
        && !value.ends_with('.')
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(SimulatorError::InvalidIdentifier { kind, value: value.to_string() })
    }
}

/// Drop a table alias qualifier (`U.ID` → `ID`)
fn bare_column(column: &str) -> &str {
    column.rsplit('.').next().unwrap_or(column)
}

/// A single SELECT, optionally terminated by one semicolon
fn validate_statement(sql: &str) -> Result<&str, SimulatorError> {
    let statement = sql.trim().trim_end_matches(';').trim_end();
    let is_select = statement.get(..6).is_some_and(|head| head.eq_ignore_ascii_case("SELECT"));
    if !is_select || statement.contains(';') {
        return Err(SimulatorError::InvalidStatement);
    }
    Ok(statement)
}

fn temp_index_name(table: &str, column: &str) -> String {
    format!("tmp_idx_{table}_{column}").to_lowercase().replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPlans;

    #[async_trait]
    impl PlanSimulator for FixedPlans {
        async fn simulate(&self, _table: &str, _column: &str, _sql: &str) -> Result<WhatIfPlan, SimulatorError> {
            Ok(WhatIfPlan {
                plan_before: serde_json::json!({"access_type": "ALL"}),
                plan_after: serde_json::json!({"access_type": "ref"}),
            })
        }
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("table", "users").is_ok());
        assert!(validate_identifier("table", "shop.users").is_ok());
        assert!(validate_identifier("table", "users; DROP TABLE x").is_err());
        assert!(validate_identifier("column", "").is_err());
        assert!(validate_identifier("column", "`id`").is_err());
        assert!(validate_identifier("table", ".users").is_err());
    }

    #[test]
    fn test_validate_statement() {
        assert_eq!(validate_statement(" select * from t where a = 1; ").unwrap(), "select * from t where a = 1");
        assert!(validate_statement("DELETE FROM t").is_err());
        assert!(validate_statement("SELECT 1; DROP TABLE t").is_err());
        assert!(validate_statement("sel").is_err());
    }

    #[test]
    fn test_temp_index_name_and_bare_column() {
        assert_eq!(temp_index_name("Shop.Users", "Email"), "tmp_idx_shop_users_email");
        assert_eq!(bare_column("U.ID"), "ID");
        assert_eq!(bare_column("email"), "email");
    }

    #[tokio::test]
    async fn test_disabled_simulator_falls_back() {
        let outcome = simulate_or_fallback(&DisabledSimulator, "users", "email", "SELECT 1").await;
        assert!(!outcome.ok);
        assert!(outcome.plan_before.is_none());
        assert!(outcome.message.unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_successful_simulation_outcome() {
        let outcome = simulate_or_fallback(&FixedPlans, "users", "email", "SELECT 1").await;
        assert!(outcome.ok);
        assert_eq!(outcome.plan_after, Some(serde_json::json!({"access_type": "ref"})));
        assert!(outcome.message.is_none());
    }

    #[tokio::test]
    async fn test_build_simulator_disabled_without_url() {
        let config = SimulatorConfig { enabled: true, mysql_url: None };
        let simulator = build_simulator(&config);
        let outcome = simulate_or_fallback(simulator.as_ref(), "users", "email", "SELECT 1").await;
        assert!(!outcome.ok);
    }
}
