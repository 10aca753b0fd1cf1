// Common test utilities and helpers

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::Config;
use crate::services::llm::{DisabledGenerator, LlmError, TextGenerator};
use crate::services::plan_simulator::{DisabledSimulator, PlanSimulator, SimulatorError, WhatIfPlan};
use crate::{AppState, build_router};

/// Generator that always answers with the same text
pub struct CannedGenerator(pub &'static str);

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.0.to_string())
    }
}

/// Simulator returning fixed plans without touching a database
pub struct FixedPlanSimulator;

#[async_trait]
impl PlanSimulator for FixedPlanSimulator {
    async fn simulate(&self, _table: &str, _column: &str, _sql: &str) -> Result<WhatIfPlan, SimulatorError> {
        Ok(WhatIfPlan {
            plan_before: json!({ "access_type": "ALL" }),
            plan_after: json!({ "access_type": "ref" }),
        })
    }
}

/// State with both collaborators disabled
pub fn offline_state() -> Arc<AppState> {
    Arc::new(AppState::with_collaborators(
        Config::default(),
        Arc::new(DisabledGenerator),
        Arc::new(DisabledSimulator),
    ))
}

pub fn state_with(
    text_generator: Arc<dyn TextGenerator>,
    plan_simulator: Arc<dyn PlanSimulator>,
) -> Arc<AppState> {
    Arc::new(AppState::with_collaborators(Config::default(), text_generator, plan_simulator))
}

/// Background traffic plus one full scan (`SCAN`) and one leading-wildcard search (`LIKE`)
pub fn sample_records() -> Vec<Value> {
    let mut records: Vec<Value> = (0..30)
        .map(|i| {
            json!({
                "query_id": format!("BG{i}"),
                "query": format!("SELECT name FROM users WHERE email = 'user{i}@example.com'"),
                "timestamp": "2024-05-02T13:45:00",
                "execution_time": 20.0 + (i % 7) as f64,
                "rows_examined": 100 + (i % 13),
            })
        })
        .collect();

    records.push(json!({
        "query_id": "SCAN",
        "query": "SELECT * FROM users WHERE id = 123",
        "timestamp": "2024-05-02T13:46:00",
        "execution_time": 250.0,
        "rows_examined": 150000,
    }));
    records.push(json!({
        "query_id": "LIKE",
        "query": "SELECT * FROM products WHERE name LIKE '%phone%'",
        "timestamp": "2024-05-02T13:47:00",
        "exec_time_ms": 30.0,
        "rows_examined": 200,
    }));
    records
}

/// Send one request through the router, returning status and decoded JSON body
pub async fn send(state: Arc<AppState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = build_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, json)
}
