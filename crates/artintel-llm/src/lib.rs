//! Model-server integration for article intelligence.
//!
//! Embeds article commentary through an Ollama-compatible `/api/embed`
//! endpoint, summarises aggregate metrics with a few-shot chat prompt, and
//! turns natural-language questions into read-only SQL.

pub mod client;
pub mod embeddings;
pub mod error;
pub mod sql;
pub mod summary;

pub use client::{ChatMessage, OllamaClient, Role};
pub use embeddings::{embed_for_storage, fit_to_dim};
pub use error::LlmError;
pub use summary::{fallback_summary, Summariser, EMPTY_SUMMARY};
