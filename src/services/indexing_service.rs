//! Indexing service for the embedding backfill.
//!
//! Sweeps messages from ended conversations that have no stored
//! embedding yet and fills the gap with a single batched provider
//! call. The sweep is idempotent and safe to run concurrently: the
//! primary key on the embeddings table resolves races, so a message
//! embedded twice simply keeps the first write.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Embedding, MessageId};
use crate::providers::ai::AiCapability;
use crate::storage::queries::{embeddings, messages};
use crate::storage::{Database, DatabaseError};

/// Errors that can occur during indexing.
#[derive(Debug, Error)]
pub enum IndexingError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for indexing operations.
pub type IndexingResult<T> = Result<T, IndexingError>;

/// Outcome of one backfill sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Embedding rows written by this sweep.
    pub embedded: usize,
    /// Rows another sweep wrote first.
    pub skipped: usize,
    /// Whether the provider failed and zero vectors were stored.
    pub degraded: bool,
}

/// Backfills embeddings for messages in ended conversations.
pub struct IndexingService {
    db: Database,
    ai: AiCapability,
}

impl IndexingService {
    /// Creates a new indexing service.
    pub fn new(db: Database, ai: AiCapability) -> Self {
        Self { db, ai }
    }

    /// Embeds every message from an ended conversation that has no
    /// stored vector yet, in ascending message ID order, using one
    /// batched provider call. A no-op when nothing is pending.
    pub async fn ensure_embeddings_for_ended_conversations(&self) -> IndexingResult<IndexReport> {
        let pending = messages::pending_embedding(&self.db).await?;

        if pending.is_empty() {
            tracing::debug!("No messages awaiting embedding");
            return Ok(IndexReport::default());
        }

        let texts: Vec<String> = pending.iter().map(|m| m.content.clone()).collect();
        let outcome = self.ai.embed_batch(&texts).await;
        let degraded = outcome.is_degraded();

        let entries: Vec<(MessageId, Embedding)> = pending
            .iter()
            .map(|m| m.id)
            .zip(outcome.into_vectors())
            .collect();

        let embedded = embeddings::insert_many(&self.db, entries).await?;
        let skipped = pending.len() - embedded;

        tracing::info!(embedded, skipped, degraded, "Embedding backfill complete");

        Ok(IndexReport {
            embedded,
            skipped,
            degraded,
        })
    }
}
