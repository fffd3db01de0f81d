//! doc-rag: question answering over a local text or PDF document
//!
//! The document is split into sentence-aligned chunks, embedded through an
//! Ollama embedding model, and stored in a small vector index persisted under
//! `models/<name>_index/`. Questions retrieve the closest chunks and an Ollama
//! generation model answers from them, citing the chunks it used.

pub mod checker;
pub mod config;
pub mod display;
pub mod error;
pub mod handlers;
pub mod index;
pub mod index_manager;
pub mod ingestion;
pub mod logger;
pub mod pipeline;
pub mod providers;
pub mod query;
pub mod selector;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use index::VectorIndex;
pub use logger::WorkflowLogger;
pub use pipeline::RagPipeline;
pub use query::{QueryEngine, ResponseMode};
pub use types::{QueryResult, ScoredNode};
pub use workflow::{Workflow, WorkflowOutcome};
