//! Application wiring and command dispatch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::Settings;
use crate::domain::{ConversationId, Role};
use crate::providers::ai::{AiCapability, GeminiProvider};
use crate::services::{ConversationService, IndexingService, RetrievalService, SearchService};
use crate::storage::Database;

/// Conversation memory with semantic retrieval and keyword search.
#[derive(Debug, Parser)]
#[command(name = "recall", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a new conversation.
    New {
        /// Conversation title.
        title: String,
    },
    /// List all conversations, newest first.
    List,
    /// Show a conversation with its transcript.
    Show {
        /// Conversation ID.
        id: i64,
    },
    /// Post a message. User messages get an assistant reply.
    Say {
        /// Conversation ID.
        id: i64,
        /// Message content.
        content: String,
        /// Message role.
        #[arg(long, default_value = "user", value_parser = parse_role)]
        role: Role,
    },
    /// End a conversation, producing its summary and tags.
    End {
        /// Conversation ID.
        id: i64,
    },
    /// Backfill embeddings for messages in ended conversations.
    Index,
    /// Ask a question answered from indexed conversations.
    Ask {
        /// The question.
        query: String,
        /// Number of excerpts used as context.
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Keyword search over titles, summaries, and messages.
    Search {
        /// Search terms.
        query: String,
        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn parse_role(value: &str) -> std::result::Result<Role, String> {
    Role::parse(value).ok_or_else(|| format!("invalid role '{}', expected user or assistant", value))
}

/// Main application entry point.
pub struct App {
    conversations: ConversationService,
    indexing: IndexingService,
    retrieval: RetrievalService,
    search: SearchService,
}

impl App {
    /// Opens the database and wires the provider and services.
    pub async fn bootstrap(settings: &Settings) -> Result<Self> {
        let db = Database::open(settings.database_path())
            .await
            .context("opening database")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.provider.timeout_secs))
            .build()
            .context("building HTTP client")?;

        let mut provider = GeminiProvider::new(
            settings.provider.api_key(),
            &settings.provider.chat_model,
            &settings.provider.embed_model,
        )
        .with_client(client)
        .with_dimension(settings.provider.dimension);

        if let Some(base_url) = &settings.provider.base_url {
            provider = provider.with_base_url(base_url);
        }

        let provider = Arc::new(provider);
        let ai = AiCapability::new(provider.clone(), provider);

        Ok(Self {
            conversations: ConversationService::new(db.clone(), ai.clone()),
            indexing: IndexingService::new(db.clone(), ai.clone()),
            retrieval: RetrievalService::new(db.clone(), ai).with_top_k(settings.retrieval.top_k),
            search: SearchService::new(db).with_limit(settings.search.max_results),
        })
    }

    /// Runs one command to completion, printing its result as JSON.
    pub async fn run(self, command: Command) -> Result<()> {
        match command {
            Command::New { title } => {
                let conversation = self.conversations.start(&title).await?;
                print_json(&conversation)
            }
            Command::List => {
                let conversations = self.conversations.list().await?;
                print_json(&conversations)
            }
            Command::Show { id } => {
                let id = ConversationId(id);
                let conversation = self.conversations.get(id).await?;
                let messages = self.conversations.transcript(id).await?;
                print_json(&serde_json::json!({
                    "conversation": conversation,
                    "messages": messages,
                }))
            }
            Command::Say { id, content, role } => {
                let exchange = self
                    .conversations
                    .post_message(ConversationId(id), role, &content)
                    .await?;
                print_json(&exchange)
            }
            Command::End { id } => {
                let conversation = self.conversations.end(ConversationId(id)).await?;
                print_json(&conversation)
            }
            Command::Index => {
                let report = self
                    .indexing
                    .ensure_embeddings_for_ended_conversations()
                    .await?;
                print_json(&report)
            }
            Command::Ask { query, top_k } => {
                let retrieval = match top_k {
                    Some(k) => self.retrieval.with_top_k(k),
                    None => self.retrieval,
                };
                let response = retrieval.ask(&query).await?;
                print_json(&response)
            }
            Command::Search { query, limit } => {
                let search = match limit {
                    Some(n) => self.search.with_limit(n),
                    None => self.search,
                };
                let response = search.search(&query).await?;
                print_json(&response)
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
