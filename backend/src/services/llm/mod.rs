//! LLM Service Module
//!
//! Optional text generation for the analyzer: a conversational assistant over
//! analyzed query logs and a per-query explanation. The analyzer never
//! depends on it; every failure here becomes a fixed fallback string.
//!
//! # Architecture
//! ```text
//! ┌─────────────────┐
//! │  TextGenerator  │  ← Trait (generic interface)
//! └────────┬────────┘
//!          │
//!    ┌─────┴──────┐
//!    ▼            ▼
//! ┌────────┐  ┌──────────┐
//! │OpenAI  │  │ Disabled │
//! │Compat  │  │          │
//! └────────┘  └──────────┘
//! ```
//!
//! # Supported Scenarios
//! - Chat over query logs
//! - Slow query explanation

mod client;
mod scenarios;

pub use client::OpenAiCompatClient;
pub use scenarios::chat::{CHAT_FALLBACK, ChatTurn, chat_reply};
pub use scenarios::explain::{EXPLAIN_FALLBACK, QueryContext, explain_query};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::LlmConfig;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM provider is not configured")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM provider returned an empty response")]
    EmptyResponse,
}

// ============================================================================
// Generator Trait
// ============================================================================

/// A provider that turns a system prompt plus user content into prose
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Used when no provider is configured
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn is_available(&self) -> bool {
        false
    }

    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

/// Pick the generator for the current configuration
pub fn build_generator(config: &LlmConfig) -> Arc<dyn TextGenerator> {
    match (&config.api_key, config.enabled) {
        (Some(key), true) if !key.is_empty() => match OpenAiCompatClient::new(config, key.clone()) {
            Ok(client) => {
                tracing::info!("LLM enabled: model={}, api_base={}", config.model, config.api_base);
                Arc::new(client)
            },
            Err(e) => {
                tracing::warn!("Failed to build LLM client, falling back to fixed text: {}", e);
                Arc::new(DisabledGenerator)
            },
        },
        _ => {
            tracing::info!("LLM disabled; chat and explanations will use fallback text");
            Arc::new(DisabledGenerator)
        },
    }
}

/// Strip markdown code fences and surrounding whitespace from model output
pub(crate) fn clean_response(text: &str) -> String {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string (e.g. "json") on the opening fence line
    let body = body.split_once('\n').map_or("", |(_, rest)| rest);
    body.trim_end().trim_end_matches("```").trim().to_string()
}
