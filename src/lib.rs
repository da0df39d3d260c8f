//! recall - Conversation memory with semantic retrieval
//!
//! This crate provides the core functionality for the recall tool,
//! including conversation lifecycle, embedding-based retrieval with
//! grounded answers, keyword search, and storage management.

pub mod app;
pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;

pub use app::App;
