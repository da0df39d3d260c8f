//! External service provider implementations.
//!
//! This module contains provider traits and implementations for
//! external services:
//!
//! - [`ai`] - AI providers (Gemini chat and embeddings)

pub mod ai;
