//! Provider abstractions for embeddings and answer generation
//!
//! The pipeline only talks to these traits, so tests can swap the Ollama
//! backends for in-process fakes.

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm, OllamaProvider};
