//! AI provider traits and supporting types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during provider calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Role of a message sent to the chat provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message sent to the chat provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Trait for text embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the provider's name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Width of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts, one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>>;
}

/// Trait for chat completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns the provider's name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Returns the model identifier being used.
    fn model(&self) -> &str;

    /// Performs a chat completion and returns the generated text.
    async fn complete(&self, messages: &[ChatMessage]) -> ProviderResult<String>;
}
