//! LLM Scenarios
//!
//! Each scenario owns its system prompt, builds the user payload and maps
//! provider failures to its fallback text.

pub mod chat;
pub mod explain;
