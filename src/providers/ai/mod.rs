//! AI provider implementations.
//!
//! This module provides the embedding and chat interfaces the pipeline
//! runs on, plus the Gemini implementation of both.
//!
//! Services never hold a provider directly. They hold an
//! [`AiCapability`], which absorbs provider failures and hands back
//! tagged outcomes instead of errors.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recall::providers::ai::{AiCapability, ChatMessage, GeminiProvider};
//!
//! # async fn example() {
//! let gemini = Arc::new(GeminiProvider::new(
//!     "api-key",
//!     "gemini-2.0-flash",
//!     "text-embedding-004",
//! ));
//!
//! // One concrete provider serves both capabilities.
//! let ai = AiCapability::new(gemini.clone(), gemini);
//!
//! // Failures degrade instead of erroring.
//! let outcome = ai.complete(&[ChatMessage::user("Hello!")]).await;
//! println!("{}", outcome.text());
//! # }
//! ```

mod capability;
mod gemini;
mod traits;

pub use capability::{AiCapability, ChatOutcome, EmbedOutcome};
pub use gemini::GeminiProvider;
pub use traits::{
    ChatMessage, ChatProvider, ChatRole, EmbeddingProvider, ProviderError, ProviderResult,
};
