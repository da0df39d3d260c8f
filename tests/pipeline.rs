//! End-to-end tests for the conversation memory pipeline.
//!
//! These tests drive the public service APIs against an in-memory
//! database with scripted providers. Each service module contains its
//! own unit tests for detailed logic testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use recall::domain::Role;
use recall::providers::ai::{
    AiCapability, ChatMessage, ChatProvider, ChatRole, EmbeddingProvider, ProviderError,
    ProviderResult,
};
use recall::services::{ConversationService, IndexingService, RetrievalService, SearchService};
use recall::storage::Database;

// ============================================================================
// Scripted Providers
// ============================================================================

/// Maps known topics to orthogonal unit vectors and counts calls.
struct TopicEmbedder {
    calls: AtomicUsize,
}

impl TopicEmbedder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    fn name(&self) -> &str {
        "topic"
    }

    fn dimension(&self) -> usize {
        3
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let lowered = text.to_lowercase();
                if lowered.contains("rust") {
                    vec![1.0, 0.0, 0.0]
                } else if lowered.contains("paris") {
                    vec![0.0, 1.0, 0.0]
                } else {
                    vec![0.0, 0.0, 1.0]
                }
            })
            .collect())
    }
}

/// Routes on the system prompt so one mock serves replies, summaries,
/// and grounded answers.
struct RoutedChat;

#[async_trait]
impl ChatProvider for RoutedChat {
    fn name(&self) -> &str {
        "routed"
    }

    fn model(&self) -> &str {
        "routed-model"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        let system = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        if system.contains("helpful assistant") {
            Ok("Sounds good.".to_string())
        } else if system.contains("Cite conversation IDs") {
            Ok("Rust ownership came up in [C1].".to_string())
        } else {
            Ok("- talked about the topic\nBrief abstract.\nTAGS: rust, memory".to_string())
        }
    }
}

struct OfflineEmbedder;

#[async_trait]
impl EmbeddingProvider for OfflineEmbedder {
    fn name(&self) -> &str {
        "offline"
    }

    fn dimension(&self) -> usize {
        3
    }

    async fn embed_batch(&self, _texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        Err(ProviderError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        })
    }
}

struct OfflineChat;

#[async_trait]
impl ChatProvider for OfflineChat {
    fn name(&self) -> &str {
        "offline"
    }

    fn model(&self) -> &str {
        "offline-model"
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> ProviderResult<String> {
        Err(ProviderError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        })
    }
}

fn capability(embedder: Arc<TopicEmbedder>) -> AiCapability {
    AiCapability::new(embedder, Arc::new(RoutedChat))
}

// ============================================================================
// Conversation Lifecycle
// ============================================================================

#[tokio::test]
async fn lifecycle_from_start_to_summary() {
    let db = Database::open_in_memory().await.unwrap();
    let conversations = ConversationService::new(db.clone(), capability(TopicEmbedder::new()));

    let conversation = conversations.start("Rust study group").await.unwrap();
    assert!(!conversation.is_ended());

    let exchange = conversations
        .post_message(conversation.id, Role::User, "How does Rust ownership work?")
        .await
        .unwrap();
    assert_eq!(exchange.reply.as_ref().unwrap().content, "Sounds good.");
    assert!(!exchange.degraded);

    let ended = conversations.end(conversation.id).await.unwrap();
    assert!(ended.is_ended());
    assert!(ended.ended_at.is_some());
    assert_eq!(ended.tags, vec!["rust", "memory"]);
    assert!(ended.summary.contains("Brief abstract."));

    // Ended conversations are immutable.
    let result = conversations
        .post_message(conversation.id, Role::User, "one more thing")
        .await;
    assert!(result.is_err());
}

// ============================================================================
// Embedding Backfill
// ============================================================================

#[tokio::test]
async fn backfill_embeds_once_and_then_idles() {
    let db = Database::open_in_memory().await.unwrap();
    let embedder = TopicEmbedder::new();
    let ai = capability(embedder.clone());
    let conversations = ConversationService::new(db.clone(), ai.clone());
    let indexing = IndexingService::new(db.clone(), ai);

    let conversation = conversations.start("Trip planning").await.unwrap();
    conversations
        .post_message(conversation.id, Role::User, "Planning a trip to Paris")
        .await
        .unwrap();
    conversations.end(conversation.id).await.unwrap();

    // The user message and the generated reply both get embedded in
    // one provider call.
    let report = indexing
        .ensure_embeddings_for_ended_conversations()
        .await
        .unwrap();
    assert_eq!(report.embedded, 2);
    assert_eq!(report.skipped, 0);
    assert!(!report.degraded);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

    // A second sweep finds nothing and never reaches the provider.
    let second = indexing
        .ensure_embeddings_for_ended_conversations()
        .await
        .unwrap();
    assert_eq!(second.embedded, 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn backfill_leaves_active_conversations_alone() {
    let db = Database::open_in_memory().await.unwrap();
    let embedder = TopicEmbedder::new();
    let ai = capability(embedder.clone());
    let conversations = ConversationService::new(db.clone(), ai.clone());
    let indexing = IndexingService::new(db.clone(), ai);

    let conversation = conversations.start("Still going").await.unwrap();
    conversations
        .post_message(conversation.id, Role::User, "not done yet")
        .await
        .unwrap();

    let report = indexing
        .ensure_embeddings_for_ended_conversations()
        .await
        .unwrap();
    assert_eq!(report.embedded, 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Grounded Questions
// ============================================================================

#[tokio::test]
async fn ask_grounds_answers_in_indexed_messages() {
    let db = Database::open_in_memory().await.unwrap();
    let embedder = TopicEmbedder::new();
    let ai = capability(embedder);
    let conversations = ConversationService::new(db.clone(), ai.clone());
    let indexing = IndexingService::new(db.clone(), ai.clone());
    let retrieval = RetrievalService::new(db.clone(), ai).with_top_k(3);

    // One conversation per topic so ranking has a contrast. Seeding
    // with assistant messages keeps the corpus to one row each.
    let rust = conversations.start("Rust notes").await.unwrap();
    conversations
        .post_message(
            rust.id,
            Role::Assistant,
            "Rust ownership moves values by default",
        )
        .await
        .unwrap();
    conversations.end(rust.id).await.unwrap();

    let travel = conversations.start("Travel notes").await.unwrap();
    conversations
        .post_message(
            travel.id,
            Role::Assistant,
            "Paris in spring needs a light jacket",
        )
        .await
        .unwrap();
    conversations.end(travel.id).await.unwrap();

    indexing
        .ensure_embeddings_for_ended_conversations()
        .await
        .unwrap();

    let response = retrieval.ask("tell me about rust ownership").await.unwrap();
    assert_eq!(response.answer, "Rust ownership came up in [C1].");
    assert_eq!(response.excerpts.len(), 2);

    // The best excerpt comes from the matching conversation.
    assert_eq!(response.excerpts[0].conversation_id, rust.id);
    assert!(response.excerpts[0].snippet.contains("ownership"));
    assert!(response.excerpts[0].score > 0.9);
    assert!(response.excerpts[1].score < 0.1);
}

// ============================================================================
// Keyword Search
// ============================================================================

#[tokio::test]
async fn search_finds_messages_and_reports_counts() {
    let db = Database::open_in_memory().await.unwrap();
    let conversations = ConversationService::new(db.clone(), capability(TopicEmbedder::new()));
    let search = SearchService::new(db.clone());

    let conversation = conversations.start("Weekend in Paris").await.unwrap();
    conversations
        .post_message(
            conversation.id,
            Role::Assistant,
            "The Louvre needs a timed ticket",
        )
        .await
        .unwrap();

    let response = search.search("paris").await.unwrap();
    assert_eq!(response.answer, "Found 1 relevant excerpts.");
    assert_eq!(response.excerpts[0].conversation_id, conversation.id);

    let blank = search.search("   ").await.unwrap();
    assert_eq!(blank.answer, "Please type something to search.");
    assert!(blank.excerpts.is_empty());

    let missing = search.search("zanzibar").await.unwrap();
    assert_eq!(missing.answer, "No relevant results found.");
    assert!(missing.excerpts.is_empty());
}

// ============================================================================
// Degraded Providers
// ============================================================================

#[tokio::test]
async fn pipeline_survives_provider_outage() {
    let db = Database::open_in_memory().await.unwrap();
    let ai = AiCapability::new(Arc::new(OfflineEmbedder), Arc::new(OfflineChat));
    let conversations = ConversationService::new(db.clone(), ai.clone());
    let indexing = IndexingService::new(db.clone(), ai.clone());
    let retrieval = RetrievalService::new(db.clone(), ai);

    let conversation = conversations.start("Outage drill").await.unwrap();
    let exchange = conversations
        .post_message(conversation.id, Role::User, "anyone there?")
        .await
        .unwrap();
    assert!(exchange.degraded);
    assert!(exchange.reply.unwrap().content.starts_with("(AI error:"));

    let ended = conversations.end(conversation.id).await.unwrap();
    assert!(ended.is_ended());
    assert!(ended.summary.starts_with("(AI error:"));
    assert!(ended.tags.is_empty());

    let report = indexing
        .ensure_embeddings_for_ended_conversations()
        .await
        .unwrap();
    assert!(report.degraded);
    assert_eq!(report.embedded, 2);

    // Zero vectors rank at score zero but the flow still answers.
    let response = retrieval.ask("status?").await.unwrap();
    assert!(response.answer.starts_with("(AI error:"));
    assert_eq!(response.excerpts.len(), 2);
}
