//! Database query modules for CRUD operations.
//!
//! Each module provides async functions that operate on the database.

pub mod conversations;
pub mod embeddings;
pub mod messages;
