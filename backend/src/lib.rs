//! Query Profiler
//!
//! Analyzes logs of executed SQL queries: normalizes and fingerprints each
//! statement, flags statistical outliers and rule violations, and proposes
//! index or rewrite recommendations. Exposed as a library, a one-shot CLI
//! and an HTTP service.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::services::llm::{TextGenerator, build_generator};
use crate::services::plan_simulator::{PlanSimulator, build_simulator};
use crate::services::query_analyzer::QueryAnalyzer;

/// Shared, immutable application state
pub struct AppState {
    pub config: Config,
    pub text_generator: Arc<dyn TextGenerator>,
    pub plan_simulator: Arc<dyn PlanSimulator>,
}

impl AppState {
    /// Build the state and its collaborators from configuration
    pub fn new(config: Config) -> Self {
        let text_generator = build_generator(&config.llm);
        let plan_simulator = build_simulator(&config.simulator);
        Self::with_collaborators(config, text_generator, plan_simulator)
    }

    pub fn with_collaborators(
        config: Config,
        text_generator: Arc<dyn TextGenerator>,
        plan_simulator: Arc<dyn PlanSimulator>,
    ) -> Self {
        Self { config, text_generator, plan_simulator }
    }

    /// A fresh analyzer for one batch
    pub fn analyzer(&self) -> QueryAnalyzer {
        QueryAnalyzer::new(&self.config.analyzer)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::analyze::analyze,
        handlers::analyze::recommendation,
        handlers::analyze::why,
        handlers::llm::chat,
        handlers::simulate::simulate_index,
    ),
    components(schemas(
        models::AnalyzeRequest,
        models::ChatRequest,
        models::ChatResponse,
        models::SimulateRequest,
        models::WhyResponse,
        models::HealthResponse,
        services::query_analyzer::LogRecord,
        services::query_analyzer::FeatureRow,
        services::query_analyzer::ScoredRow,
        services::query_analyzer::IndexReason,
        services::query_analyzer::RecItem,
        services::query_analyzer::Recommendation,
        services::query_analyzer::FingerprintSummary,
        services::query_analyzer::AnalysisReport,
        services::llm::ChatTurn,
        services::llm::QueryContext,
        services::plan_simulator::WhatIfPlan,
        services::plan_simulator::SimulationOutcome,
        utils::error::ApiErrorResponse,
    )),
    tags(
        (name = "Analysis", description = "Query log scoring and recommendations"),
        (name = "LLM", description = "LLM-assisted explanations"),
        (name = "Simulation", description = "What-if index simulation"),
        (name = "System", description = "Service health")
    ),
    info(title = "Query Profiler API", description = "SQL query log analyzer")
)]
pub struct ApiDoc;

/// Build the HTTP router with all API routes and Swagger UI
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/analyze", post(handlers::analyze::analyze))
        .route("/api/recommendations/:query_id", post(handlers::analyze::recommendation))
        .route("/api/why/:query_id", post(handlers::analyze::why))
        .route("/api/chat", post(handlers::llm::chat))
        .route("/api/simulate-index", post(handlers::simulate::simulate_index))
        .with_state(state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
