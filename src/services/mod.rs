//! Business services layer.
//!
//! This module contains the core services that orchestrate business logic,
//! coordinating between providers, storage, and domain types.
//!
//! # Architecture
//!
//! Services sit between the application layer and the infrastructure layer:
//!
//! ```text
//! Application Layer (CLI, JSON output)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Providers, Storage)
//! ```
//!
//! # Services Overview
//!
//! - [`ConversationService`]: Manages conversation lifecycle, replies, and summaries
//! - [`IndexingService`]: Backfills embeddings for ended conversations
//! - [`RetrievalService`]: Ranks indexed messages and answers grounded questions
//! - [`SearchService`]: Keyword fallback search over titles, summaries, and messages

mod conversation_service;
mod indexing_service;
mod retrieval_service;
mod search_service;

pub use conversation_service::{
    ConversationError, ConversationResult, ConversationService, Exchange,
};
pub use indexing_service::{IndexReport, IndexingError, IndexingResult, IndexingService};
pub use retrieval_service::{
    Excerpt, QueryResponse, RetrievalError, RetrievalResult, RetrievalService, ScoredMessage,
};
pub use search_service::{SearchError, SearchHit, SearchResponse, SearchResult, SearchService};
