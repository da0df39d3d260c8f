//! Embedding storage operations.
//!
//! Writes use INSERT OR IGNORE against the message_id primary key, so
//! two indexers racing over the same message agree silently: the first
//! write wins and the second is a no-op.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::domain::{ConversationId, EmbeddedMessage, Embedding, MessageEmbedding, MessageId};
use crate::storage::database::{Database, Result};

/// Stores an embedding for a message. Returns false when the message
/// already had one.
pub async fn insert(db: &Database, message_id: MessageId, vector: &Embedding) -> Result<bool> {
    let blob = vector.to_bytes();

    db.with_conn(move |conn| {
        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO message_embeddings (message_id, embedding, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![message_id.0, blob, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    })
    .await
}

/// Stores a batch of embeddings in one transaction. Returns the number
/// of rows actually written; rows that already existed are skipped.
pub async fn insert_many(db: &Database, entries: Vec<(MessageId, Embedding)>) -> Result<usize> {
    db.transaction(move |tx| {
        let now = Utc::now().to_rfc3339();
        let mut written = 0;

        for (message_id, vector) in &entries {
            let changed = tx.execute(
                r#"
                INSERT OR IGNORE INTO message_embeddings (message_id, embedding, created_at)
                VALUES (?1, ?2, ?3)
                "#,
                params![message_id.0, vector.to_bytes(), now],
            )?;
            written += changed;
        }

        Ok(written)
    })
    .await
}

/// Retrieves the stored embedding for a message.
pub async fn get(db: &Database, message_id: MessageId) -> Result<Option<MessageEmbedding>> {
    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT message_id, embedding, created_at
            FROM message_embeddings
            WHERE message_id = ?1
            "#,
        )?;

        let result = stmt
            .query_row([message_id.0], row_to_message_embedding)
            .optional()?;
        Ok(result)
    })
    .await
}

/// Loads every embedded message from ended conversations, in ascending
/// message ID order. This is the ranking corpus.
pub async fn load_embedded_messages(db: &Database) -> Result<Vec<EmbeddedMessage>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT m.id, m.conversation_id, m.content, m.created_at, e.embedding
            FROM message_embeddings e
            JOIN messages m ON m.id = e.message_id
            JOIN conversations c ON c.id = m.conversation_id
            WHERE c.status = 'ended'
            ORDER BY m.id ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let created_str: String = row.get(3)?;
            let blob: Vec<u8> = row.get(4)?;
            Ok(EmbeddedMessage {
                message_id: MessageId(row.get(0)?),
                conversation_id: ConversationId(row.get(1)?),
                content: row.get(2)?,
                created_at: DateTime::parse_from_rfc3339(&created_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                vector: Embedding::from_bytes(&blob),
            })
        })?;

        let messages: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(messages?)
    })
    .await
}

/// Counts stored embeddings.
pub async fn count(db: &Database) -> Result<u32> {
    db.with_conn(|conn| {
        let count: u32 =
            conn.query_row("SELECT COUNT(*) FROM message_embeddings", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    })
    .await
}

fn row_to_message_embedding(
    row: &Row<'_>,
) -> std::result::Result<MessageEmbedding, rusqlite::Error> {
    let blob: Vec<u8> = row.get(1)?;
    let created_str: String = row.get(2)?;

    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(MessageEmbedding {
        message_id: MessageId(row.get(0)?),
        vector: Embedding::from_bytes(&blob),
        created_at,
    })
}
