//! Conversation CRUD operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::domain::{Conversation, ConversationId, ConversationStatus};
use crate::storage::database::{Database, Result};

/// Inserts a new active conversation and returns it.
pub async fn insert(db: &Database, title: &str) -> Result<Conversation> {
    let title = title.to_string();

    db.with_conn(move |conn| {
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO conversations (title, status, summary, tags, started_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                title,
                ConversationStatus::Active.as_str(),
                "",
                "[]",
                now.to_rfc3339(),
            ],
        )?;

        Ok(Conversation {
            id: ConversationId(conn.last_insert_rowid()),
            title,
            status: ConversationStatus::Active,
            summary: String::new(),
            tags: Vec::new(),
            started_at: now,
            ended_at: None,
        })
    })
    .await
}

/// Retrieves a conversation by its ID.
pub async fn get(db: &Database, id: ConversationId) -> Result<Option<Conversation>> {
    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, status, summary, tags, started_at, ended_at
            FROM conversations
            WHERE id = ?1
            "#,
        )?;

        let result = stmt.query_row([id.0], row_to_conversation).optional()?;
        Ok(result)
    })
    .await
}

/// Lists all conversations, newest first. Ties on the start time fall
/// back to descending ID so the order is stable.
pub async fn list(db: &Database) -> Result<Vec<Conversation>> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, title, status, summary, tags, started_at, ended_at
            FROM conversations
            ORDER BY started_at DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map([], row_to_conversation)?;
        let conversations: std::result::Result<Vec<_>, _> = rows.collect();
        Ok(conversations?)
    })
    .await
}

/// Marks a conversation ended, recording its summary and tags.
pub async fn mark_ended(
    db: &Database,
    id: ConversationId,
    summary: &str,
    tags: &[String],
) -> Result<()> {
    let summary = summary.to_string();
    let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());

    db.with_conn(move |conn| {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            UPDATE conversations
            SET status = ?1, summary = ?2, tags = ?3, ended_at = ?4
            WHERE id = ?5
            "#,
            params![
                ConversationStatus::Ended.as_str(),
                summary,
                tags_json,
                now,
                id.0,
            ],
        )?;
        Ok(())
    })
    .await
}

fn row_to_conversation(row: &Row<'_>) -> std::result::Result<Conversation, rusqlite::Error> {
    let status_str: String = row.get(2)?;
    let tags_json: String = row.get(4)?;
    let started_str: String = row.get(5)?;
    let ended_str: Option<String> = row.get(6)?;

    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

    let started_at = DateTime::parse_from_rfc3339(&started_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let ended_at = ended_str.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    });

    Ok(Conversation {
        id: ConversationId(row.get(0)?),
        title: row.get(1)?,
        status: ConversationStatus::parse(&status_str).unwrap_or(ConversationStatus::Active),
        summary: row.get(3)?,
        tags,
        started_at,
        ended_at,
    })
}
