//! Conversation lifecycle service.
//!
//! Handles the live side of the system: starting conversations,
//! posting messages (with an assistant reply generated for user
//! messages), and ending a conversation, which produces its summary
//! and tags and makes it eligible for the embedding backfill.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Conversation, ConversationId, Message, Role};
use crate::providers::ai::{AiCapability, ChatMessage};
use crate::storage::queries::{conversations, messages};
use crate::storage::{Database, DatabaseError};

/// System instruction for assistant replies in live conversations.
const REPLY_SYSTEM_PROMPT: &str = "You are a concise, helpful assistant.";

/// System instruction for the end-of-conversation summary.
const SUMMARY_SYSTEM_PROMPT: &str = "You are a concise conversation analyst.";

/// Errors that can occur during conversation operations.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// Conversation not found.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    /// Conversation already ended and is immutable.
    #[error("conversation already ended: {0}")]
    Ended(ConversationId),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for conversation operations.
pub type ConversationResult<T> = Result<T, ConversationError>;

/// A posted message together with the generated reply, if any.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    /// The message that was posted.
    pub message: Message,
    /// Assistant reply, generated only for user messages.
    pub reply: Option<Message>,
    /// Whether the reply is a degradation placeholder.
    pub degraded: bool,
}

/// Manages active conversations and the active-to-ended transition.
pub struct ConversationService {
    db: Database,
    ai: AiCapability,
}

impl ConversationService {
    /// Creates a new conversation service.
    pub fn new(db: Database, ai: AiCapability) -> Self {
        Self { db, ai }
    }

    /// Starts a new active conversation.
    pub async fn start(&self, title: &str) -> ConversationResult<Conversation> {
        let conversation = conversations::insert(&self.db, title).await?;
        tracing::info!(id = %conversation.id, "Conversation started");
        Ok(conversation)
    }

    /// Lists all conversations, newest first.
    pub async fn list(&self) -> ConversationResult<Vec<Conversation>> {
        Ok(conversations::list(&self.db).await?)
    }

    /// Retrieves a conversation.
    pub async fn get(&self, id: ConversationId) -> ConversationResult<Conversation> {
        conversations::get(&self.db, id)
            .await?
            .ok_or(ConversationError::NotFound(id))
    }

    /// Returns a conversation's messages in transcript order.
    pub async fn transcript(&self, id: ConversationId) -> ConversationResult<Vec<Message>> {
        self.get(id).await?;
        Ok(messages::list_for_conversation(&self.db, id).await?)
    }

    /// Posts a message to an active conversation. User messages get an
    /// assistant reply generated over the full transcript; a degraded
    /// provider still yields a stored placeholder reply, so the
    /// response shape never changes on outage.
    pub async fn post_message(
        &self,
        id: ConversationId,
        role: Role,
        content: &str,
    ) -> ConversationResult<Exchange> {
        let conversation = self.get(id).await?;
        if conversation.is_ended() {
            return Err(ConversationError::Ended(id));
        }

        let message = messages::insert(&self.db, id, role, content).await?;

        if role != Role::User {
            return Ok(Exchange {
                message,
                reply: None,
                degraded: false,
            });
        }

        let transcript = messages::list_for_conversation(&self.db, id).await?;
        let mut prompt = vec![ChatMessage::system(REPLY_SYSTEM_PROMPT)];
        prompt.extend(transcript.iter().map(to_chat_message));

        let outcome = self.ai.complete(&prompt).await;
        let degraded = outcome.is_degraded();
        let mut reply_text = outcome.into_text();
        if reply_text.is_empty() {
            reply_text = "...".to_string();
        }

        let reply = messages::insert(&self.db, id, Role::Assistant, &reply_text).await?;

        Ok(Exchange {
            message,
            reply: Some(reply),
            degraded,
        })
    }

    /// Ends an active conversation: summarizes and tags the transcript,
    /// then flips the status. Ending is terminal; a second call fails.
    pub async fn end(&self, id: ConversationId) -> ConversationResult<Conversation> {
        let conversation = self.get(id).await?;
        if conversation.is_ended() {
            return Err(ConversationError::Ended(id));
        }

        let transcript = messages::list_for_conversation(&self.db, id).await?;
        let dump = transcript
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let (summary, tags) = self.summarize_and_tag(&dump).await;
        conversations::mark_ended(&self.db, id, &summary, &tags).await?;

        tracing::info!(id = %id, tags = tags.len(), "Conversation ended");

        self.get(id).await
    }

    /// Produces the summary text and tag list for a transcript dump.
    /// A degraded provider yields the placeholder as summary and no
    /// tags.
    async fn summarize_and_tag(&self, dump: &str) -> (String, Vec<String>) {
        let prompt = [
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Summarize the conversation in 5–8 bullet points.\n\
                 Write a 2–3 line abstract.\n\
                 Finally output a line exactly like: TAGS: tag1, tag2, tag3\n\n\
                 Conversation:\n{}",
                dump
            )),
        ];

        let summary = self.ai.complete(&prompt).await.into_text();
        let tags = parse_tags(&summary);
        (summary, tags)
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message.role {
        Role::User => ChatMessage::user(message.content.clone()),
        Role::Assistant => ChatMessage::assistant(message.content.clone()),
    }
}

/// Extracts the tag list from the last `TAGS:` line of the summary.
/// The line stays part of the summary text.
fn parse_tags(summary: &str) -> Vec<String> {
    for line in summary.lines().rev() {
        if line.trim().to_uppercase().starts_with("TAGS:") {
            if let Some((_, rest)) = line.split_once(':') {
                return rest
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }
    }
    Vec::new()
}
