//! Message CRUD operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::domain::{ConversationId, Message, MessageId, Role};
use crate::storage::database::{Database, Result};

/// Inserts a new message and returns it.
pub async fn insert(
    db: &Database,
    conversation_id: ConversationId,
    role: Role,
    content: &str,
) -> Result<Message> {
    let content = content.to_string();

    db.with_conn(move |conn| {
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO messages (conversation_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![conversation_id.0, role.as_str(), content, now.to_rfc3339()],
        )?;

        Ok(Message {
            id: MessageId(conn.last_insert_rowid()),
            conversation_id,
            role,
            content,
            created_at: now,
        })
    })
    .await
}

/// Lists a conversation's messages in transcript order. Ties on the
/// creation time fall back to ascending ID so the order is stable.
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: ConversationId,
) -> Result<Vec<Message>> {
    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM messages
            WHERE conversation_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )?;

        let rows = stmt.query_map([conversation_id.0], row_to_message)?;
        let messages: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(messages?)
    })
    .await
}

/// Lists messages from ended conversations that have no stored
/// embedding yet, in ascending ID order.
pub async fn pending_embedding(db: &Database) -> Result<Vec<Message>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT m.id, m.conversation_id, m.role, m.content, m.created_at
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            LEFT JOIN message_embeddings e ON e.message_id = m.id
            WHERE c.status = 'ended' AND e.message_id IS NULL
            ORDER BY m.id ASC
            "#,
        )?;

        let rows = stmt.query_map([], row_to_message)?;
        let messages: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(messages?)
    })
    .await
}

fn row_to_message(row: &Row<'_>) -> std::result::Result<Message, rusqlite::Error> {
    let role_str: String = row.get(2)?;
    let created_str: String = row.get(4)?;

    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Message {
        id: MessageId(row.get(0)?),
        conversation_id: ConversationId(row.get(1)?),
        role: Role::parse(&role_str).unwrap_or(Role::User),
        content: row.get(3)?,
        created_at,
    })
}
