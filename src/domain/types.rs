//! Core identifier types for domain entities.
//!
//! These newtype wrappers provide type safety for entity identifiers,
//! preventing accidental mixing of different ID types. Identifiers are
//! the storage layer's integer row ids, which also serve as the
//! deterministic ordering key for pipeline processing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
