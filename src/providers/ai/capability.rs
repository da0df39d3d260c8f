//! Degradation-aware wrapper around the AI providers.
//!
//! Services depend on this capability object rather than on raw
//! providers. Provider failures are absorbed here: embedding calls
//! fall back to zero vectors and chat calls fall back to a placeholder
//! reply, each tagged so callers can tell a real result from a
//! degraded one.

use std::sync::Arc;

use super::traits::{ChatMessage, ChatProvider, EmbeddingProvider};
use crate::domain::Embedding;

/// Result of an embedding call. Never an error: failures degrade to
/// zero vectors so the pipeline keeps moving.
#[derive(Debug, Clone)]
pub enum EmbedOutcome {
    /// Vectors produced by the provider, one per input text in order.
    Embedded(Vec<Embedding>),
    /// Zero vectors substituted after a provider failure.
    Degraded {
        vectors: Vec<Embedding>,
        reason: String,
    },
}

impl EmbedOutcome {
    /// Whether the provider call failed and zero vectors were substituted.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The vectors, real or substituted.
    pub fn vectors(&self) -> &[Embedding] {
        match self {
            Self::Embedded(vectors) => vectors,
            Self::Degraded { vectors, .. } => vectors,
        }
    }

    /// Consumes the outcome, yielding the vectors either way.
    pub fn into_vectors(self) -> Vec<Embedding> {
        match self {
            Self::Embedded(vectors) => vectors,
            Self::Degraded { vectors, .. } => vectors,
        }
    }
}

/// Result of a chat call. Never an error: failures degrade to a
/// placeholder reply naming the failure.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    /// Text generated by the provider.
    Replied(String),
    /// Placeholder text substituted after a provider failure.
    Degraded { text: String, reason: String },
}

impl ChatOutcome {
    /// Whether the provider call failed and a placeholder was substituted.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The reply text, real or placeholder.
    pub fn text(&self) -> &str {
        match self {
            Self::Replied(text) => text,
            Self::Degraded { text, .. } => text,
        }
    }

    /// Consumes the outcome, yielding the text either way.
    pub fn into_text(self) -> String {
        match self {
            Self::Replied(text) => text,
            Self::Degraded { text, .. } => text,
        }
    }
}

/// The AI capability handed to services.
///
/// Holds the embedding and chat providers behind trait objects so
/// tests can swap in fakes without touching the services.
#[derive(Clone)]
pub struct AiCapability {
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
}

impl AiCapability {
    /// Creates a capability from the two providers.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, chat: Arc<dyn ChatProvider>) -> Self {
        Self { embedder, chat }
    }

    /// Width of the vectors the embedding provider produces.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Embeds a batch of texts, degrading to zero vectors on failure.
    pub async fn embed_batch(&self, texts: &[String]) -> EmbedOutcome {
        if texts.is_empty() {
            return EmbedOutcome::Embedded(Vec::new());
        }

        match self.embedder.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => {
                EmbedOutcome::Embedded(vectors.into_iter().map(Embedding::new).collect())
            }
            Ok(vectors) => {
                let reason = format!(
                    "expected {} vectors, provider returned {}",
                    texts.len(),
                    vectors.len()
                );
                tracing::warn!(
                    provider = self.embedder.name(),
                    "Embedding count mismatch, substituting zero vectors: {}",
                    reason
                );
                self.degraded_embeddings(texts.len(), reason)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.embedder.name(),
                    "Embedding call failed, substituting zero vectors: {}",
                    e
                );
                self.degraded_embeddings(texts.len(), e.to_string())
            }
        }
    }

    fn degraded_embeddings(&self, count: usize, reason: String) -> EmbedOutcome {
        let dimension = self.embedder.dimension();
        EmbedOutcome::Degraded {
            vectors: (0..count)
                .map(|_| Embedding::new(vec![0.0; dimension]))
                .collect(),
            reason,
        }
    }

    /// Runs a chat completion, degrading to a placeholder on failure.
    pub async fn complete(&self, messages: &[ChatMessage]) -> ChatOutcome {
        match self.chat.complete(messages).await {
            Ok(text) => ChatOutcome::Replied(text),
            Err(e) => {
                tracing::warn!(
                    provider = self.chat.name(),
                    "Chat call failed, substituting placeholder: {}",
                    e
                );
                ChatOutcome::Degraded {
                    text: format!("(AI error: {})", e),
                    reason: e.to_string(),
                }
            }
        }
    }
}
