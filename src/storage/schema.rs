//! SQL schema definitions as const strings.
//!
//! Contains the complete SQLite schema for the conversation memory store.

/// SQL to create the conversations table.
pub const CREATE_CONVERSATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    summary TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',
    started_at TEXT NOT NULL,
    ended_at TEXT
)
"#;

/// SQL to create the messages table.
pub const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create message indexes.
pub const CREATE_MESSAGE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at)
"#;

/// SQL to create the message_embeddings table.
///
/// The primary key doubles as the uniqueness guarantee for the
/// embedding backfill: concurrent indexers inserting the same message
/// collide here instead of writing a second row.
pub const CREATE_MESSAGE_EMBEDDINGS: &str = r#"
CREATE TABLE IF NOT EXISTS message_embeddings (
    message_id INTEGER PRIMARY KEY REFERENCES messages(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// Returns all schema creation statements in order.
pub fn all_migrations() -> Vec<&'static str> {
    vec![
        CREATE_CONVERSATIONS,
        CREATE_MESSAGES,
        CREATE_MESSAGE_INDEXES,
        CREATE_MESSAGE_EMBEDDINGS,
    ]
}
