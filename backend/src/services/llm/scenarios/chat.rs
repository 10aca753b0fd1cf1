//! Chat Scenario - conversational assistant over analyzed query logs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::explain::QueryContext;
use crate::services::llm::TextGenerator;

const PROMPT: &str = include_str!("chat_prompt.md");

pub const CHAT_FALLBACK: &str =
    "The AI assistant is not available right now. Please check the LLM configuration and try again.";

/// One message of the conversation so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    history: &'a [ChatTurn],
    context: &'a [QueryContext],
    question: &'a str,
}

/// Answer a question about the analyzed rows; never fails
pub async fn chat_reply(
    generator: &dyn TextGenerator,
    history: &[ChatTurn],
    question: &str,
    context: &[QueryContext],
) -> String {
    if !generator.is_available() {
        return CHAT_FALLBACK.to_string();
    }

    let payload = match serde_json::to_string_pretty(&ChatPayload { history, context, question }) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Failed to build chat payload: {}", e);
            return CHAT_FALLBACK.to_string();
        },
    };

    match generator.generate(PROMPT, &payload).await {
        Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
        Ok(_) => {
            tracing::warn!("Chat generation returned empty text");
            CHAT_FALLBACK.to_string()
        },
        Err(e) => {
            tracing::warn!("Chat generation failed: {}", e);
            CHAT_FALLBACK.to_string()
        },
    }
}
