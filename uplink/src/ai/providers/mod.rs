//! Language and image model provider abstraction layer
//!
//! This module defines the `LanguageModel` and `ImageModel` traits which abstract over the
//! hosted inference APIs the gateway talks to. Chat completions are consumed as incremental
//! streams so responses can be relayed to clients token by token.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod openai_compat;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur when talking to an inference provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider response could not be decoded: {0}")]
    Decode(String),
}

/// A single message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// One of `system`, `user` or `assistant`
    pub role: String,
    pub content: String,
}

/// An incremental piece of a streamed model response.
///
/// Thinking models interleave `Reasoning` parts with the visible `Text` answer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    Text(String),
    Reasoning(String),
}

/// A generated image, returned inline rather than by reference.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Base64-encoded image bytes
    pub base64: String,
    pub mime_type: String,
}

/// Abstract chat model interface
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Upstream model identifier requests are issued with.
    fn model_id(&self) -> &str;

    /// Stream a chat completion as incremental parts.
    ///
    /// The returned stream ends when the provider closes the response; transport errors
    /// surface as `Err` items in the stream.
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<BoxStream<'static, Result<StreamPart>>>;
}

/// Abstract image generation interface
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Upstream model identifier requests are issued with.
    fn model_id(&self) -> &str;

    /// Generate a single image from a text prompt.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage>;
}
