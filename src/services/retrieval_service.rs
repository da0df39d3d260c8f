//! Retrieval service for semantic search over past conversations.
//!
//! Embeds the query, ranks the stored corpus by cosine similarity,
//! assembles a citation-tagged context block from the top hits, and
//! asks the chat provider for an answer grounded in that context.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{ConversationId, EmbeddedMessage, Embedding};
use crate::providers::ai::{AiCapability, ChatMessage, ChatOutcome};
use crate::storage::queries::embeddings;
use crate::storage::{Database, DatabaseError};

/// System instruction for grounded answering.
const ANSWER_SYSTEM_PROMPT: &str =
    "You are a precise conversation analyst. Cite conversation IDs like [C123].";

/// Context snippets are cut at this many characters.
const SNIPPET_LIMIT: usize = 350;

/// Hits returned per query unless overridden.
const DEFAULT_TOP_K: usize = 8;

/// Errors that can occur during retrieval.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for retrieval operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// A corpus message with its similarity score against the query.
#[derive(Debug, Clone)]
pub struct ScoredMessage {
    /// Cosine similarity against the query vector.
    pub score: f32,
    /// The embedded message being scored.
    pub message: EmbeddedMessage,
}

/// A context excerpt returned alongside the answer.
#[derive(Debug, Clone, Serialize)]
pub struct Excerpt {
    /// Conversation the excerpt came from.
    pub conversation_id: ConversationId,
    /// When the underlying message was created.
    pub created_at: DateTime<Utc>,
    /// Truncated message content.
    pub snippet: String,
    /// Similarity score, rounded to four decimal places.
    pub score: f32,
}

/// Grounded answer with its supporting excerpts.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// The generated answer (or degradation placeholder).
    pub answer: String,
    /// Excerpts backing the answer, in rank order.
    pub excerpts: Vec<Excerpt>,
}

/// Answers natural-language queries over embedded past conversations.
pub struct RetrievalService {
    db: Database,
    ai: AiCapability,
    top_k: usize,
}

impl RetrievalService {
    /// Creates a new retrieval service with the default result count.
    pub fn new(db: Database, ai: AiCapability) -> Self {
        Self {
            db,
            ai,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Overrides how many hits feed the context block.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Scores the embedded corpus against a query vector and returns
    /// the top `k` hits, best first.
    ///
    /// The corpus load re-checks conversation status, so rows that
    /// slipped in for active conversations never surface here. Equal
    /// scores keep ascending message ID order from the scan.
    pub async fn rank(
        &self,
        query_vector: &Embedding,
        k: usize,
    ) -> RetrievalResult<Vec<ScoredMessage>> {
        let corpus = embeddings::load_embedded_messages(&self.db).await?;

        let mut hits: Vec<ScoredMessage> = corpus
            .into_iter()
            .map(|message| ScoredMessage {
                score: query_vector.cosine_similarity(&message.vector),
                message,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Turns ranked hits into a citation-tagged context block plus the
    /// excerpt list, preserving rank order in both.
    pub fn build_context(hits: &[ScoredMessage]) -> (String, Vec<Excerpt>) {
        let mut lines = Vec::with_capacity(hits.len());
        let mut excerpts = Vec::with_capacity(hits.len());

        for hit in hits {
            let snippet = truncate_snippet(&hit.message.content);
            lines.push(format!("[C{}] {}", hit.message.conversation_id, snippet));
            excerpts.push(Excerpt {
                conversation_id: hit.message.conversation_id,
                created_at: hit.message.created_at,
                snippet,
                score: round4(hit.score),
            });
        }

        (lines.join("\n\n"), excerpts)
    }

    /// Asks the chat provider for an answer grounded in the supplied
    /// context. Provider failures surface as placeholder text, never
    /// as errors.
    pub async fn answer(&self, query: &str, context_text: &str) -> ChatOutcome {
        let messages = [
            ChatMessage::system(ANSWER_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Context:\n{}\n\nQuestion: {}\n\nAnswer using only the context. If uncertain, say so.",
                context_text, query
            )),
        ];
        self.ai.complete(&messages).await
    }

    /// Full pipeline: embed the query, rank, assemble context, answer.
    pub async fn ask(&self, query: &str) -> RetrievalResult<QueryResponse> {
        let outcome = self.ai.embed_batch(&[query.to_string()]).await;
        if outcome.is_degraded() {
            tracing::warn!("Query embedding degraded; ranking scores will be near zero");
        }
        let query_vector = outcome
            .into_vectors()
            .into_iter()
            .next()
            .unwrap_or_else(|| Embedding::new(vec![0.0; self.ai.dimension()]));

        let hits = self.rank(&query_vector, self.top_k).await?;
        let (context_text, excerpts) = Self::build_context(&hits);
        let answer = self.answer(query, &context_text).await.into_text();

        Ok(QueryResponse { answer, excerpts })
    }
}

/// Cuts content at the snippet limit, marking the cut with an ellipsis.
fn truncate_snippet(content: &str) -> String {
    let total = content.chars().count();
    let mut snippet: String = content.chars().take(SNIPPET_LIMIT).collect();
    if total > SNIPPET_LIMIT {
        snippet.push_str("...");
    }
    snippet
}

fn round4(score: f32) -> f32 {
    (score * 10_000.0).round() / 10_000.0
}
