//! Wire types for the chat endpoint.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::ai::providers::ChatMessage;

/// A chat completion request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Model slot id to serve the request with. Falls back to the default chat model.
    #[serde(default)]
    pub model: Option<String>,
    /// Conversation so far, oldest message first
    pub messages: Vec<ChatMessage>,
}
