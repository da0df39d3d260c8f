//! Domain layer types for the conversation memory pipeline.
//!
//! This module contains the core domain types used throughout the
//! application, including conversation, message, and embedding entities.

mod conversation;
mod embedding;
mod message;
mod types;

pub use conversation::{Conversation, ConversationStatus};
pub use embedding::{Embedding, EmbeddedMessage, MessageEmbedding, EMBEDDING_DIM};
pub use message::{Message, Role};
pub use types::{ConversationId, MessageId};
