//! Conversation and embedding storage.
//!
//! This module provides the SQLite storage layer, including:
//!
//! - Conversations, messages, and per-message embedding vectors
//! - Async-safe database operations via tokio::task::spawn_blocking
//! - The uniqueness constraint the embedding backfill relies on

mod database;
pub mod queries;
mod schema;

pub use database::{Database, DatabaseError, Result};
