//! Message entity and speaker roles.

use super::types::{ConversationId, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human participant.
    User,
    /// The AI participant.
    Assistant,
}

impl Role {
    /// String form used by the storage layer and transcript dumps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parses the storage-layer string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A single message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Speaker role.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}
