//! Conversation entity and lifecycle status.

use super::types::ConversationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a conversation.
///
/// Conversations start out active and accept new messages. Once ended
/// they become immutable and eligible for embedding and retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Accepting new messages, excluded from retrieval.
    Active,
    /// Closed to new messages, indexed for retrieval.
    Ended,
}

impl ConversationStatus {
    /// String form used by the storage layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    /// Parses the storage-layer string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "ended" => Some(Self::Ended),
            _ => None,
        }
    }
}

/// A conversation between a user and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier.
    pub id: ConversationId,
    /// Human-readable title.
    pub title: String,
    /// Lifecycle status.
    pub status: ConversationStatus,
    /// Bullet-point summary produced when the conversation ends.
    pub summary: String,
    /// Topic tags produced when the conversation ends.
    pub tags: Vec<String>,
    /// When the conversation was started.
    pub started_at: DateTime<Utc>,
    /// When the conversation was ended, if it has been.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Whether the conversation has been ended.
    pub fn is_ended(&self) -> bool {
        self.status == ConversationStatus::Ended
    }
}
